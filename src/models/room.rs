//! Room model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::RoomRef;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    #[default]
    Classroom,
    Lab,
    Hall,
}

impl RoomType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Classroom => "classroom",
            RoomType::Lab => "lab",
            RoomType::Hall => "hall",
        }
    }
}

impl std::str::FromStr for RoomType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "classroom" => Ok(RoomType::Classroom),
            "lab" => Ok(RoomType::Lab),
            "hall" => Ok(RoomType::Hall),
            _ => Err(format!("Invalid room type: {}", s)),
        }
    }
}

/// Operational status set by administrators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Available,
    Maintenance,
    Unavailable,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Available => "available",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Unavailable => "unavailable",
        }
    }
}

impl std::str::FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(RoomStatus::Available),
            "maintenance" => Ok(RoomStatus::Maintenance),
            "unavailable" => Ok(RoomStatus::Unavailable),
            _ => Err(format!("Invalid room status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub room_type: RoomType,
    pub capacity: i64,
    pub facilities: Vec<String>,
    pub description: String,
    pub is_active: bool,
    pub status: RoomStatus,
    pub maintenance_note: Option<String>,
    /// Mean of visible review ratings, one decimal; 0 without reviews
    pub average_rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Whether new bookings may be submitted for this room
    pub fn is_bookable(&self) -> bool {
        self.is_active && self.status == RoomStatus::Available
    }

    pub fn to_ref(&self) -> RoomRef {
        RoomRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[serde(default)]
    pub room_type: RoomType,
    #[validate(range(min = 0, max = 10000, message = "capacity must be between 0 and 10000"))]
    pub capacity: i64,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default)]
    pub maintenance_note: Option<String>,
}

fn default_active() -> bool {
    true
}

/// Partial room update; absent fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct UpdateRoomRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: Option<String>,
    pub room_type: Option<RoomType>,
    #[validate(range(min = 0, max = 10000, message = "capacity must be between 0 and 10000"))]
    pub capacity: Option<i64>,
    pub facilities: Option<Vec<String>>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub status: Option<RoomStatus>,
    pub maintenance_note: Option<String>,
}

impl UpdateRoomRequest {
    /// Names of the fields this request touches, for the activity log
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.room_type.is_some() {
            fields.push("room_type");
        }
        if self.capacity.is_some() {
            fields.push("capacity");
        }
        if self.facilities.is_some() {
            fields.push("facilities");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.is_active.is_some() {
            fields.push("is_active");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.maintenance_note.is_some() {
            fields.push("maintenance_note");
        }
        fields
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RoomListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}
