//! User repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{User, UserRole};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    id_number: Option<String>,
    faculty: Option<String>,
    phone: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_db_uuid(&row.id)?,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            role: row.role.parse::<UserRole>().map_err(anyhow::Error::msg)?,
            id_number: row.id_number,
            faculty: row.faculty,
            phone: row.phone,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

const SELECT_USER: &str = "SELECT id, username, email, full_name, password_hash, role, \
                           id_number, faculty, phone, created_at, updated_at FROM users";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, clause: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("{SELECT_USER} WHERE {clause} = ?");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool)
            .await
            .with_context(|| format!("Failed to fetch user by {}", clause))?;

        row.map(User::try_from).transpose()
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.fetch_one_where("id", &id.to_string()).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.fetch_one_where("username", username).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_one_where("email", email).await
    }

    pub async fn get_by_id_number(&self, id_number: &str) -> Result<Option<User>> {
        self.fetch_one_where("id_number", id_number).await
    }

    /// Account matching either an email address or a campus ID number
    pub async fn find_by_email_or_id_number(&self, identifier: &str) -> Result<Option<User>> {
        match self.get_by_email(identifier).await? {
            Some(user) => Ok(Some(user)),
            None => self.get_by_id_number(identifier).await,
        }
    }

    /// Write back the self-editable profile fields
    pub async fn update_profile(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET full_name = ?, email = ?, id_number = ?, faculty = ?, phone = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(user.id_number.as_deref())
        .bind(user.faculty.as_deref())
        .bind(user.phone.as_deref())
        .bind(to_db(user.updated_at))
        .bind(user.id.to_string())
        .execute(self.pool)
        .await
        .context("Failed to update profile")?;

        Ok(())
    }

    pub async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, full_name, password_hash, role,
                               id_number, faculty, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.id_number.as_deref())
        .bind(user.faculty.as_deref())
        .bind(user.phone.as_deref())
        .bind(to_db(user.created_at))
        .bind(to_db(user.updated_at))
        .execute(self.pool)
        .await
        .context("Failed to create user")?;

        Ok(())
    }

    /// Email addresses of every administrator account
    pub async fn admin_emails(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT email FROM users WHERE role = ? ORDER BY username")
                .bind(UserRole::Admin.as_str())
                .fetch_all(self.pool)
                .await
                .context("Failed to list administrators")?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}
