//! Reminder scheduler
//!
//! Runs the H-1 reminder job in-process on a cron schedule evaluated in the
//! organizational time zone. The same job is exposed through the
//! `send-reminders` binary for deployments that prefer system cron.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use cron::Schedule;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::db::DbPool;
use crate::services::notification::Notifier;
use crate::services::reminders::ReminderJob;
use crate::utils::OrgTimezone;

/// Handle to a running reminder scheduler
#[derive(Debug, Clone)]
pub struct ReminderSchedulerState {
    running: Arc<RwLock<bool>>,
}

impl ReminderSchedulerState {
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Ask the loop to exit after its current sleep
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Reminder scheduler stop requested");
    }
}

/// Spawn the reminder loop
pub fn start_reminder_scheduler(
    pool: DbPool,
    timezone: OrgTimezone,
    notifier: Arc<Notifier>,
    cron_expr: String,
) -> ReminderSchedulerState {
    let state = ReminderSchedulerState {
        running: Arc::new(RwLock::new(true)),
    };

    let loop_state = state.clone();
    tokio::spawn(async move {
        reminder_loop(loop_state, pool, timezone, notifier, cron_expr).await;
    });

    info!("Reminder scheduler started");
    state
}

async fn reminder_loop(
    state: ReminderSchedulerState,
    pool: DbPool,
    timezone: OrgTimezone,
    notifier: Arc<Notifier>,
    cron_expr: String,
) {
    let job = ReminderJob::new(pool, timezone, notifier);

    loop {
        let Some(next) = calculate_next_run(&cron_expr, timezone.offset()) else {
            error!("Reminder schedule '{}' yields no future run, stopping", cron_expr);
            break;
        };

        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        info!(next_run = %next, "Next reminder run scheduled");
        tokio::time::sleep(wait).await;

        if !state.is_running().await {
            info!("Reminder scheduler stopping");
            break;
        }

        match job.run(None, false).await {
            Ok(summary) => info!(
                found = summary.found,
                sent = summary.sent,
                failed = summary.failed,
                "Reminder run completed"
            ),
            Err(e) => error!("Reminder run failed: {:#}", e),
        }
    }

    let mut running = state.running.write().await;
    *running = false;
}

/// Next occurrence of a cron expression, evaluated in `offset` local time
pub fn calculate_next_run(cron_expr: &str, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let schedule = match Schedule::from_str(cron_expr) {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid cron expression '{}': {}", cron_expr, e);
            return None;
        }
    };

    schedule
        .upcoming(offset)
        .next()
        .map(|local| local.with_timezone(&Utc))
}

/// Validate a cron expression
pub fn validate_cron_expression(cron_expr: &str) -> Result<(), String> {
    Schedule::from_str(cron_expr)
        .map(|_| ())
        .map_err(|e| format!("Invalid cron expression: {}", e))
}
