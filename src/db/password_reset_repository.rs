//! Single-use password reset tokens

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_uuid, to_db};

pub struct PasswordResetRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PasswordResetRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new token for the user, retiring any earlier unused ones
    pub async fn issue(&self, user_id: Uuid, token: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query("UPDATE password_reset_tokens SET is_used = 1 WHERE user_id = ? AND is_used = 0")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to retire earlier reset tokens")?;

        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token, expires_at, is_used, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(token)
        .bind(to_db(expires_at))
        .bind(to_db(Utc::now()))
        .execute(&mut *tx)
        .await
        .context("Failed to store reset token")?;

        tx.commit().await.context("Failed to commit reset token")?;
        Ok(())
    }

    /// Spend a token and set the new password hash in one transaction
    ///
    /// Returns the account's id, or `None` when the token is unknown,
    /// expired or already used.
    pub async fn redeem(
        &self,
        token: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let row: Option<(String,)> = sqlx::query_as(
            "SELECT user_id FROM password_reset_tokens \
             WHERE token = ? AND is_used = 0 AND expires_at > ?",
        )
        .bind(token)
        .bind(to_db(now))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to look up reset token")?;
        let Some((user_id,)) = row else {
            return Ok(None);
        };

        let spent = sqlx::query(
            "UPDATE password_reset_tokens SET is_used = 1 WHERE token = ? AND is_used = 0",
        )
        .bind(token)
        .execute(&mut *tx)
        .await
        .context("Failed to spend reset token")?;
        if spent.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(to_db(now))
            .bind(&user_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update password")?;

        tx.commit().await.context("Failed to commit password reset")?;
        Ok(Some(parse_db_uuid(&user_id)?))
    }
}
