//! Database layer
//!
//! SQLite storage for:
//! - Rooms and their operational status
//! - Bookings, guarded against overlap by both the service and a trigger
//! - User accounts and their password reset tokens
//! - Room reviews and problem reports
//! - The activity log
//!
//! Instants are stored as fixed-width UTC RFC 3339 strings so that string
//! comparison in SQL is chronological comparison.

pub mod audit_repository;
pub mod booking_repository;
pub mod password_reset_repository;
pub mod report_repository;
pub mod review_repository;
pub mod room_repository;
pub mod stats_repository;
pub mod user_repository;

pub use audit_repository::AuditRepository;
pub use booking_repository::BookingRepository;
pub use password_reset_repository::PasswordResetRepository;
pub use report_repository::ReportRepository;
pub use review_repository::ReviewRepository;
pub use room_repository::RoomRepository;
pub use stats_repository::StatsRepository;
pub use user_repository::UserRepository;

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Message raised by the overlap trigger
pub const OVERLAP_TRIGGER_MESSAGE: &str = "booking_overlap";

/// Primary result code shared by SQLITE_BUSY and its extended codes
const SQLITE_BUSY: i32 = 5;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let connect_options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Failed to parse database URL: {}", config.url))?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.connect_timeout_secs))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check that the database answers queries
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Storage form of an instant
pub fn to_db(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp in database: {}", value))
}

pub fn parse_db_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).with_context(|| format!("Invalid UUID in database: {}", value))
}

/// Whether an error came from the overlap trigger
pub fn is_overlap_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.message().contains(OVERLAP_TRIGGER_MESSAGE),
        _ => false,
    }
}

/// Whether SQLite refused the write because another writer holds the database
pub fn is_busy(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            .map(|code| code & 0xff == SQLITE_BUSY)
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether an error is a UNIQUE constraint violation
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}
