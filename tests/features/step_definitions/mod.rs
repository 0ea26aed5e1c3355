//! Step definitions for Cucumber scenarios

pub mod booking_steps;
