//! SmartSpace Library
//!
//! Room-booking conflict detection and availability for campus facilities.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, AuthUser, Claims};

use services::{
    AdminDirectory, AvailabilityService, BookingService, DashboardService, Mailer, Notifier,
    RoomLocks,
};
use utils::OrgTimezone;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    /// Organizational time zone used for every day and month boundary
    pub timezone: OrgTimezone,
    /// Per-room write locks serializing booking writes
    pub room_locks: Arc<RoomLocks>,
    pub notifier: Arc<Notifier>,
}

impl AppState {
    /// Wire up shared services over an initialized pool
    pub async fn build(config: AppConfig, db: DbPool, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let timezone = OrgTimezone::new(
            config
                .organization
                .offset()
                .context("Invalid organization UTC offset")?,
        );
        let admins = Arc::new(AdminDirectory::load(&db, &config.admin).await?);
        let notifier = Arc::new(Notifier::new(
            mailer,
            admins,
            timezone,
            config.organization.name.clone(),
        ));
        let room_locks = Arc::new(RoomLocks::new(Duration::from_millis(
            config.booking.lock_timeout_ms,
        )));

        Ok(Self {
            config,
            db,
            timezone,
            room_locks,
            notifier,
        })
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(self.db.clone(), self.timezone)
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(
            self.db.clone(),
            self.config.booking.clone(),
            self.timezone,
            self.room_locks.clone(),
            self.notifier.clone(),
        )
    }

    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.db.clone(), self.timezone)
    }
}
