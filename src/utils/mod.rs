//! Shared utilities

pub mod error;
pub mod logging;
pub mod time;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};
pub use time::OrgTimezone;
