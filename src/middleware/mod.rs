//! Middleware components
//!
//! This module contains middleware for:
//! - Authentication (JWT)
//! - Client address resolution
//! - Rate limiting
//! - Security headers

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod security_headers;

pub use auth::{auth_middleware, AuthUser, Claims};
pub use client_ip::ClientIp;
