//! Admin dashboard aggregation

use anyhow::Result;
use chrono::Duration;

use crate::db::{DbPool, RoomRepository, StatsRepository};
use crate::models::{BookingStatus, DashboardStats, TimeSpan};
use crate::utils::OrgTimezone;

/// Days covered by the submission trend, today included
const TREND_DAYS: i64 = 30;

pub struct DashboardService {
    pool: DbPool,
    timezone: OrgTimezone,
}

impl DashboardService {
    pub fn new(pool: DbPool, timezone: OrgTimezone) -> Self {
        Self { pool, timezone }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        let stats = StatsRepository::new(&self.pool);
        let modifier = self.timezone.sqlite_modifier();

        let status_distribution = stats.status_distribution().await?;
        let count_of = |status: BookingStatus| {
            status_distribution
                .iter()
                .find(|s| s.status == status.as_str())
                .map(|s| s.count)
                .unwrap_or(0)
        };
        let pending = count_of(BookingStatus::Pending);
        let approved = count_of(BookingStatus::Approved);

        let daily_trend = stats
            .daily_submissions(&self.trend_window(), &modifier)
            .await?;

        Ok(DashboardStats {
            total_bookings: stats.total_bookings().await?,
            pending,
            approved,
            active_rooms: RoomRepository::new(&self.pool).count_active().await?,
            daily_trend,
            weekday_popularity: stats.weekday_popularity(&modifier).await?,
            status_distribution,
        })
    }

    /// The last 30 local days through the end of today
    fn trend_window(&self) -> TimeSpan {
        let today = self.timezone.day_window(self.timezone.today());
        TimeSpan::spanning(today.end() - Duration::days(TREND_DAYS), today.end())
    }
}
