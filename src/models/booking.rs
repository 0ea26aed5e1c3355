//! Booking model and lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::TimeSpan;

/// Booking status
///
/// Only `Pending` and `Approved` bookings hold their slot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(rename = "On Process")]
    OnProcess,
    Cancelled,
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Owner,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot change booking status from {from} to {to}")]
pub struct TransitionError {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Approved,
        BookingStatus::Rejected,
        BookingStatus::OnProcess,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Approved => "Approved",
            BookingStatus::Rejected => "Rejected",
            BookingStatus::OnProcess => "On Process",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether a booking in this status blocks other bookings of its room
    pub fn reserves_slot(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Approved)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Rejected | BookingStatus::Cancelled)
    }

    /// The single entry point for status changes
    pub fn transition(self, to: BookingStatus, actor: Actor) -> Result<BookingStatus, TransitionError> {
        use BookingStatus::*;

        let allowed = match (self, to) {
            (Pending, Cancelled) => true,
            (Pending, Approved | Rejected | OnProcess) => actor == Actor::Admin,
            (OnProcess, Approved | Rejected | Cancelled) => actor == Actor::Admin,
            (Approved, Cancelled) => actor == Actor::Admin,
            _ => false,
        };

        if allowed {
            Ok(to)
        } else {
            Err(TransitionError { from: self, to })
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "on_process" | "onprocess" => Some(BookingStatus::OnProcess),
                _ => None,
            })
            .ok_or_else(|| format!("Invalid booking status: {}", s))
    }
}

/// Booking entity with the room and requester names joined in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub room_id: Uuid,
    pub room_name: String,
    pub user_id: Uuid,
    pub requester_name: String,
    pub requester_email: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub guest_count: i64,
    pub purpose: String,
    pub document_name: Option<String>,
    pub document_ref: Option<String>,
    pub document_size: Option<i64>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn span(&self) -> TimeSpan {
        TimeSpan::spanning(self.starts_at, self.ends_at)
    }
}

/// Reference to an uploaded supporting document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub file_name: String,
    pub size_bytes: u64,
    /// Storage key returned by the upload service
    #[serde(default)]
    pub storage_ref: Option<String>,
}

/// Request to create a booking
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub room_id: Uuid,
    pub start_time: String,
    pub end_time: String,
    #[validate(range(min = 1, message = "guest count must be at least 1"))]
    pub guest_count: i64,
    #[serde(default)]
    #[validate(length(max = 1000, message = "purpose must be at most 1000 characters"))]
    pub purpose: String,
    #[serde(default)]
    pub document: Option<DocumentUpload>,
}

/// Admin status update
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingListQuery {
    pub status: Option<BookingStatus>,
    pub room_id: Option<Uuid>,
}

/// Validated insert payload
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub room_id: Uuid,
    pub user_id: Uuid,
    pub span: TimeSpan,
    pub guest_count: i64,
    pub purpose: String,
    pub document: Option<DocumentUpload>,
}

/// Per-status booking counts
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub on_process: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn add(&mut self, status: BookingStatus, count: i64) {
        self.total += count;
        match status {
            BookingStatus::Pending => self.pending += count,
            BookingStatus::Approved => self.approved += count,
            BookingStatus::Rejected => self.rejected += count,
            BookingStatus::OnProcess => self.on_process += count,
            BookingStatus::Cancelled => self.cancelled += count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyBookingsResponse {
    pub bookings: Vec<Booking>,
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCountResponse {
    pub pending: i64,
}
