//! Aggregate queries behind the admin dashboard
//!
//! Grouping by day or weekday happens in the organizational zone, applied
//! through an SQLite date modifier such as `+420 minutes`.

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::to_db;
use crate::models::{DailyCount, StatusCount, TimeSpan, WeekdayCount};

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

pub struct StatsRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> StatsRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn total_bookings(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(self.pool)
            .await
            .context("Failed to count bookings")?;
        Ok(count)
    }

    pub async fn status_distribution(&self) -> Result<Vec<StatusCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM bookings GROUP BY status ORDER BY COUNT(*) DESC, status",
        )
        .fetch_all(self.pool)
        .await
        .context("Failed to query status distribution")?;

        Ok(rows
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }

    /// Bookings submitted per local day within `window`
    pub async fn daily_submissions(
        &self,
        window: &TimeSpan,
        local_modifier: &str,
    ) -> Result<Vec<DailyCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT date(created_at, ?) AS day, COUNT(*)
            FROM bookings
            WHERE created_at >= ? AND created_at < ?
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(local_modifier)
        .bind(to_db(window.start()))
        .bind(to_db(window.end()))
        .fetch_all(self.pool)
        .await
        .context("Failed to query daily submissions")?;

        Ok(rows
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect())
    }

    /// Bookings per local weekday of their start, all seven days present
    pub async fn weekday_popularity(&self, local_modifier: &str) -> Result<Vec<WeekdayCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT strftime('%w', starts_at, ?) AS weekday, COUNT(*)
            FROM bookings
            GROUP BY weekday
            "#,
        )
        .bind(local_modifier)
        .fetch_all(self.pool)
        .await
        .context("Failed to query weekday popularity")?;

        let mut counts = [0i64; 7];
        for (weekday, count) in rows {
            if let Ok(idx) = weekday.parse::<usize>() {
                if idx < counts.len() {
                    counts[idx] = count;
                }
            }
        }

        Ok(counts
            .iter()
            .enumerate()
            .map(|(idx, count)| WeekdayCount {
                weekday: idx as u32,
                name: WEEKDAY_NAMES[idx].to_string(),
                count: *count,
            })
            .collect())
    }
}
