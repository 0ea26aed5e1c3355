//! Integration tests for SmartSpace
//!
//! These tests drive the API endpoints against a real SQLite file with all
//! routing and authentication in place.

mod account_tests;
mod booking_tests;
mod feedback_tests;
