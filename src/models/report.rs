//! Problem reports filed against rooms

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomReport {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_name: String,
    /// `None` once the reporter's account is gone
    pub user_id: Option<Uuid>,
    pub reporter_name: Option<String>,
    pub description: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReportRequest {
    #[serde(default)]
    #[validate(length(max = 2000, message = "description must be at most 2000 characters"))]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveReportRequest {
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportListQuery {
    pub resolved: Option<bool>,
    pub room_id: Option<Uuid>,
}
