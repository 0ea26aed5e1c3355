//! Business logic services

pub mod admin_directory;
pub mod auth;
pub mod availability;
pub mod booking;
pub mod dashboard;
pub mod notification;
pub mod reminders;
pub mod room_locks;
pub mod scheduler;

pub use admin_directory::AdminDirectory;
pub use auth::{AccountError, AuthService};
pub use availability::AvailabilityService;
pub use booking::{ActingUser, BookingError, BookingService};
pub use dashboard::DashboardService;
pub use notification::{mailer_from_config, EmailMessage, LogMailer, Mailer, Notifier, SmtpMailer};
pub use reminders::{ReminderJob, ReminderSummary};
pub use room_locks::{LockTimeout, RoomLocks};
