//! Activity log repository

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{parse_db_timestamp, parse_db_uuid, to_db};
use crate::models::{ActivityAction, ActivityLogEntry, ActivityLogQuery};

const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    id: String,
    user_id: Option<String>,
    action: String,
    resource_type: String,
    resource_id: Option<String>,
    details: Option<String>,
    ip_address: Option<String>,
    created_at: String,
}

impl TryFrom<ActivityRow> for ActivityLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: ActivityRow) -> Result<Self> {
        Ok(ActivityLogEntry {
            id: parse_db_uuid(&row.id)?,
            user_id: row.user_id.as_deref().map(parse_db_uuid).transpose()?,
            action: row.action,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            details: row.details.and_then(|s| serde_json::from_str(&s).ok()),
            ip_address: row.ip_address,
            created_at: parse_db_timestamp(&row.created_at)?,
        })
    }
}

pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        user_id: Option<Uuid>,
        action: ActivityAction,
        resource_type: &str,
        resource_id: Option<&str>,
        details: Option<&serde_json::Value>,
        ip_address: Option<&str>,
    ) -> Result<ActivityLogEntry> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let details_str = details.map(|d| d.to_string());

        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, user_id, action, resource_type, resource_id, details, ip_address, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user_id.map(|u| u.to_string()))
        .bind(action.as_str())
        .bind(resource_type)
        .bind(resource_id)
        .bind(details_str.as_deref())
        .bind(ip_address)
        .bind(to_db(created_at))
        .execute(self.pool)
        .await
        .context("Failed to insert activity log entry")?;

        Ok(ActivityLogEntry {
            id,
            user_id,
            action: action.as_str().to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.map(str::to_string),
            details: details.cloned(),
            ip_address: ip_address.map(str::to_string),
            created_at,
        })
    }

    /// Newest entries first; 100 entries unless a limit is given
    pub async fn list(&self, query: &ActivityLogQuery) -> Result<Vec<ActivityLogEntry>> {
        let mut sql = String::from(
            "SELECT id, user_id, action, resource_type, resource_id, details, ip_address, created_at \
             FROM activity_logs WHERE 1 = 1",
        );

        if query.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if query.resource_type.is_some() {
            sql.push_str(" AND resource_type = ?");
        }
        if query.action.is_some() {
            sql.push_str(" AND action = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, ActivityRow>(&sql);
        if let Some(user_id) = query.user_id {
            q = q.bind(user_id.to_string());
        }
        if let Some(ref resource_type) = query.resource_type {
            q = q.bind(resource_type);
        }
        if let Some(ref action) = query.action {
            q = q.bind(action);
        }
        q = q
            .bind(i64::from(query.limit.unwrap_or(DEFAULT_LIMIT)))
            .bind(i64::from(query.offset.unwrap_or(0)));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list activity logs")?;

        rows.into_iter().map(ActivityLogEntry::try_from).collect()
    }
}
