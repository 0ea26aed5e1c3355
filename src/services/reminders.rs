//! H-1 reminder job
//!
//! Sends each requester of an approved booking a reminder the day before it
//! starts. "Tomorrow" is the local date in the organizational zone.

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{BookingRepository, DbPool};
use crate::services::notification::Notifier;
use crate::utils::OrgTimezone;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReminderSummary {
    pub date: Option<NaiveDate>,
    pub found: usize,
    pub sent: usize,
    pub failed: usize,
}

pub struct ReminderJob {
    pool: DbPool,
    timezone: OrgTimezone,
    notifier: Arc<Notifier>,
}

impl ReminderJob {
    pub fn new(pool: DbPool, timezone: OrgTimezone, notifier: Arc<Notifier>) -> Self {
        Self {
            pool,
            timezone,
            notifier,
        }
    }

    /// Remind requesters of approved bookings starting on `date`
    ///
    /// `None` means tomorrow. With `dry_run` the bookings are only counted.
    pub async fn run(&self, date: Option<NaiveDate>, dry_run: bool) -> Result<ReminderSummary> {
        let date = date.unwrap_or_else(|| {
            let today = self.timezone.today();
            today.succ_opt().unwrap_or(today)
        });
        let window = self.timezone.day_window(date);

        let bookings = BookingRepository::new(&self.pool)
            .approved_starting_in(&window)
            .await?;

        let mut summary = ReminderSummary {
            date: Some(date),
            found: bookings.len(),
            ..Default::default()
        };
        info!(%date, found = summary.found, dry_run, "Collected bookings for reminders");

        if dry_run {
            return Ok(summary);
        }

        for booking in &bookings {
            match self.notifier.booking_reminder(booking).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(booking_id = %booking.id, "Reminder delivery failed: {:#}", e);
                }
            }
        }

        Ok(summary)
    }
}
