//! Booking availability engine
//!
//! Answers three questions about a room:
//! - does a proposed interval collide with a slot-holding booking
//! - which intervals are occupied on a given local day
//! - which approved bookings touch a given local month
//!
//! All reads are lock-free. Day and month windows are half-open in the
//! organizational zone, so a booking ending exactly at midnight belongs only
//! to the day it started in.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::db::{booking_repository, DbPool};
use crate::models::{
    BookedSlot, Booking, BookingStatus, CalendarEntry, ConflictCheckResponse, ConflictInfo,
    DaySlots, MonthCalendar, Room, TimeSpan,
};
use crate::utils::validation::truncate_chars;
use crate::utils::OrgTimezone;

const SLOT_TITLE_CHARS: usize = 30;
const SLOT_DEFAULT_TITLE: &str = "Booked";
const CALENDAR_TITLE_CHARS: usize = 50;
const CALENDAR_DEFAULT_TITLE: &str = "Booking";
const MIDNIGHT_END: &str = "24:00";

#[derive(Clone)]
pub struct AvailabilityService {
    pool: DbPool,
    timezone: OrgTimezone,
}

impl AvailabilityService {
    pub fn new(pool: DbPool, timezone: OrgTimezone) -> Self {
        Self { pool, timezone }
    }

    /// Earliest-starting slot-holding booking overlapping `span`, if any
    pub async fn find_conflict(
        &self,
        room_id: Uuid,
        span: &TimeSpan,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<Option<Booking>> {
        booking_repository::find_conflict(&self.pool, room_id, span, exclude_booking_id).await
    }

    /// Conflict check result in the shape the pre-submission endpoint returns
    pub async fn check_conflict(
        &self,
        room_id: Uuid,
        span: &TimeSpan,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<ConflictCheckResponse> {
        let response = match self.find_conflict(room_id, span, exclude_booking_id).await? {
            Some(existing) => ConflictCheckResponse::conflicting(self.conflict_info(&existing)),
            None => ConflictCheckResponse::available(),
        };
        Ok(response)
    }

    /// Occupied intervals of `room` on local `date`
    pub async fn booked_slots(
        &self,
        room: &Room,
        date: NaiveDate,
        include_pending: bool,
    ) -> Result<DaySlots> {
        let window = self.timezone.day_window(date);
        let statuses: &[BookingStatus] = if include_pending {
            &[BookingStatus::Approved, BookingStatus::Pending]
        } else {
            &[BookingStatus::Approved]
        };

        let bookings =
            booking_repository::list_in_window(&self.pool, room.id, &window, statuses).await?;
        let slots: Vec<BookedSlot> = bookings
            .iter()
            .filter_map(|b| self.slot_within(b, &window))
            .collect();

        let aggregated_range = aggregate_range(&slots);

        Ok(DaySlots {
            date,
            room: room.to_ref(),
            total_bookings: slots.len(),
            slots,
            aggregated_range,
        })
    }

    /// Approved bookings intersecting the local month, ordered by start
    pub async fn approved_bookings_for_month(
        &self,
        room_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<Vec<Booking>> {
        let window = self
            .timezone
            .month_window(year, month)
            .context("Failed to compute month window")?;

        booking_repository::list_in_window(&self.pool, room_id, &window, &[BookingStatus::Approved])
            .await
    }

    /// Month calendar for `room`
    pub async fn month_calendar(&self, room: &Room, year: i32, month: u32) -> Result<MonthCalendar> {
        let bookings = self.approved_bookings_for_month(room.id, year, month).await?;

        Ok(MonthCalendar {
            room: room.to_ref(),
            year,
            month,
            bookings: bookings.iter().map(|b| self.calendar_entry(b)).collect(),
        })
    }

    /// User-facing description of a blocking booking
    pub fn conflict_info(&self, booking: &Booking) -> ConflictInfo {
        ConflictInfo {
            id: booking.id,
            title: title_or_default(&booking.purpose, CALENDAR_TITLE_CHARS, CALENDAR_DEFAULT_TITLE),
            start_time: self.timezone.format_hm(booking.starts_at),
            end_time: self.timezone.format_hm(booking.ends_at),
            date: self.timezone.format_display_date(booking.starts_at),
            user: booking.requester_name.clone(),
        }
    }

    fn calendar_entry(&self, booking: &Booking) -> CalendarEntry {
        CalendarEntry {
            id: booking.id,
            date: self.timezone.format_iso_date(booking.starts_at),
            start_time: self.timezone.format_hm(booking.starts_at),
            end_time: self.timezone.format_hm(booking.ends_at),
            start_datetime: self.timezone.format_rfc3339(booking.starts_at),
            end_datetime: self.timezone.format_rfc3339(booking.ends_at),
            title: title_or_default(&booking.purpose, CALENDAR_TITLE_CHARS, CALENDAR_DEFAULT_TITLE),
            user: booking.requester_name.clone(),
            status: booking.status.as_str().to_string(),
        }
    }

    /// The part of `booking` inside `window`, as local wall-clock times
    fn slot_within(&self, booking: &Booking, window: &TimeSpan) -> Option<BookedSlot> {
        let clipped = booking.span().clip_to(window)?;
        let end_time = if clipped.end() == window.end() {
            MIDNIGHT_END.to_string()
        } else {
            self.timezone.format_hm(clipped.end())
        };

        Some(BookedSlot {
            start_time: self.timezone.format_hm(clipped.start()),
            end_time,
            title: title_or_default(&booking.purpose, SLOT_TITLE_CHARS, SLOT_DEFAULT_TITLE),
        })
    }
}

fn title_or_default(purpose: &str, max_chars: usize, default: &str) -> String {
    let trimmed = purpose.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        truncate_chars(trimmed, max_chars)
    }
}

/// "<earliest start>-<latest end>" over slots already in start order
fn aggregate_range(slots: &[BookedSlot]) -> Option<String> {
    let first = slots.first()?;
    let latest_end = slots
        .iter()
        .map(|s| s.end_time.as_str())
        .max()
        .unwrap_or(first.end_time.as_str());
    Some(format!("{}-{}", first.start_time, latest_end))
}
