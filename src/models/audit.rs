//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BookingStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Create,
    Update,
    Approve,
    Reject,
    Cancel,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Create => "create",
            ActivityAction::Update => "update",
            ActivityAction::Approve => "approve",
            ActivityAction::Reject => "reject",
            ActivityAction::Cancel => "cancel",
            ActivityAction::Delete => "delete",
        }
    }

    /// Log action recorded for a move into `status`
    pub fn for_status(status: BookingStatus) -> Self {
        match status {
            BookingStatus::Approved => ActivityAction::Approve,
            BookingStatus::Rejected => ActivityAction::Reject,
            BookingStatus::Cancelled => ActivityAction::Cancel,
            BookingStatus::Pending | BookingStatus::OnProcess => ActivityAction::Update,
        }
    }
}

pub const RESOURCE_BOOKING: &str = "booking";
pub const RESOURCE_ROOM: &str = "room";
pub const RESOURCE_REVIEW: &str = "review";
pub const RESOURCE_REPORT: &str = "report";
pub const RESOURCE_USER: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ActivityLogQuery {
    pub user_id: Option<Uuid>,
    pub resource_type: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
