//! Time spans and the read models of the availability engine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Returned when an interval would be empty or inverted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("end time must be after start time")]
pub struct InvalidSpan;

/// Half-open interval `[start, end)` with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSpan {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSpan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidSpan> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(InvalidSpan)
        }
    }

    /// Build a span whose ordering the caller already guarantees
    pub(crate) fn spanning(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end, "TimeSpan start must be before end");
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Strict overlap; touching endpoints do not overlap
    pub fn overlaps(&self, other: &TimeSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Intersection with `window`, if any
    pub fn clip_to(&self, window: &TimeSpan) -> Option<TimeSpan> {
        if !self.overlaps(window) {
            return None;
        }
        Some(TimeSpan::spanning(
            self.start.max(window.start),
            self.end.min(window.end),
        ))
    }
}

/// Minimal room reference embedded in availability responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRef {
    pub id: Uuid,
    pub name: String,
}

/// One occupied interval of a day, in local wall-clock time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookedSlot {
    pub start_time: String,
    pub end_time: String,
    pub title: String,
}

/// Occupied intervals of one room on one local date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub room: RoomRef,
    pub slots: Vec<BookedSlot>,
    pub aggregated_range: Option<String>,
    pub total_bookings: usize,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DaySlotsQuery {
    #[serde(default)]
    pub include_pending: bool,
}

/// Calendar entry for one approved booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub id: Uuid,
    /// Local date of the start, `YYYY-MM-DD`
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub start_datetime: String,
    pub end_datetime: String,
    pub title: String,
    pub user: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub room: RoomRef,
    pub year: i32,
    pub month: u32,
    pub bookings: Vec<CalendarEntry>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// The booking that blocks a proposed slot, as shown to users
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictInfo {
    pub id: Uuid,
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    /// `%d %b %Y`, e.g. "10 Jun 2025"
    pub date: String,
    pub user: String,
}

impl ConflictInfo {
    pub fn message(&self) -> String {
        format!(
            "Slot {}-{} on {} is already booked. Please choose another available time.",
            self.start_time, self.end_time, self.date
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckRequest {
    pub room_id: Uuid,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub exclude_booking_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictInfo>,
    pub message: String,
}

impl ConflictCheckResponse {
    pub fn available() -> Self {
        Self {
            has_conflict: false,
            conflict: None,
            message: "Time slot is available for booking".to_string(),
        }
    }

    pub fn conflicting(conflict: ConflictInfo) -> Self {
        Self {
            has_conflict: true,
            message: conflict.message(),
            conflict: Some(conflict),
        }
    }
}
