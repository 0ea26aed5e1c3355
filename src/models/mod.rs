//! Data models

mod audit;
mod availability;
mod booking;
mod dashboard;
mod report;
mod review;
mod room;
mod user;

pub use audit::*;
pub use availability::*;
pub use booking::*;
pub use dashboard::*;
pub use report::*;
pub use review::*;
pub use room::*;
pub use user::*;
