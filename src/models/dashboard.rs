//! Admin dashboard statistics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    /// Local date, `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekdayCount {
    /// 0 = Sunday
    pub weekday: u32,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_bookings: i64,
    pub pending: i64,
    pub approved: i64,
    pub active_rooms: i64,
    pub status_distribution: Vec<StatusCount>,
    pub daily_trend: Vec<DailyCount>,
    pub weekday_popularity: Vec<WeekdayCount>,
}
