//! Room problem report repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{display_name, ReportListQuery, RoomReport};

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: String,
    room_id: String,
    room_name: String,
    user_id: Option<String>,
    full_name: Option<String>,
    username: Option<String>,
    description: String,
    is_resolved: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ReportRow> for RoomReport {
    type Error = anyhow::Error;

    fn try_from(row: ReportRow) -> Result<Self> {
        let reporter_name = match (&row.full_name, &row.username) {
            (Some(full_name), Some(username)) => Some(display_name(full_name, username).to_string()),
            _ => None,
        };
        Ok(RoomReport {
            id: parse_db_uuid(&row.id)?,
            room_id: parse_db_uuid(&row.room_id)?,
            room_name: row.room_name,
            user_id: row.user_id.as_deref().map(parse_db_uuid).transpose()?,
            reporter_name,
            description: row.description,
            is_resolved: row.is_resolved,
            created_at: parse_db_timestamp(&row.created_at)?,
            updated_at: parse_db_timestamp(&row.updated_at)?,
        })
    }
}

const SELECT_REPORT: &str = r#"
    SELECT p.id, p.room_id, r.name AS room_name, p.user_id, u.full_name, u.username,
           p.description, p.is_resolved, p.created_at, p.updated_at
    FROM room_reports p
    JOIN rooms r ON r.id = p.room_id
    LEFT JOIN users u ON u.id = p.user_id
"#;

pub struct ReportRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ReportRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<RoomReport>> {
        let sql = format!("{SELECT_REPORT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, ReportRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .context("Failed to fetch report")?;

        row.map(RoomReport::try_from).transpose()
    }

    pub async fn insert(
        &self,
        room_id: Uuid,
        user_id: Option<Uuid>,
        description: &str,
    ) -> Result<RoomReport> {
        let id = Uuid::new_v4();
        let now = to_db(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO room_reports (id, room_id, user_id, description, is_resolved,
                                      created_at, updated_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(room_id.to_string())
        .bind(user_id.map(|u| u.to_string()))
        .bind(description)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create report")?;

        self.get_by_id(id)
            .await?
            .context("Report not found after insert")
    }

    /// Newest first, optionally filtered by state and room
    pub async fn list(&self, query: &ReportListQuery) -> Result<Vec<RoomReport>> {
        let mut sql = format!("{SELECT_REPORT} WHERE 1 = 1");
        if query.resolved.is_some() {
            sql.push_str(" AND p.is_resolved = ?");
        }
        if query.room_id.is_some() {
            sql.push_str(" AND p.room_id = ?");
        }
        sql.push_str(" ORDER BY p.created_at DESC");

        let mut q = sqlx::query_as::<_, ReportRow>(&sql);
        if let Some(resolved) = query.resolved {
            q = q.bind(resolved);
        }
        if let Some(room_id) = query.room_id {
            q = q.bind(room_id.to_string());
        }

        let rows = q.fetch_all(self.pool).await.context("Failed to list reports")?;
        rows.into_iter().map(RoomReport::try_from).collect()
    }

    /// `None` when the report does not exist
    pub async fn set_resolved(&self, id: Uuid, resolved: bool) -> Result<Option<RoomReport>> {
        let result =
            sqlx::query("UPDATE room_reports SET is_resolved = ?, updated_at = ? WHERE id = ?")
                .bind(resolved)
                .bind(to_db(Utc::now()))
                .bind(id.to_string())
                .execute(self.pool)
                .await
                .context("Failed to update report")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }
}
