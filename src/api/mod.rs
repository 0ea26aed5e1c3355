//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{middleware::from_fn_with_state, routing::get, Router};

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitState};
use crate::AppState;

mod admin;
mod auth;
mod bookings;
mod feedback;
mod health;
mod profile;
mod rooms;

pub use health::*;

/// Public API routes (no authentication required)
///
/// When `auth_rate_limit` is given, it applies to the `/auth` endpoints only.
pub fn public_routes(auth_rate_limit: Option<RateLimitState>) -> Router<AppState> {
    let mut auth_routes = auth::public_routes();
    if let Some(limiter) = auth_rate_limit {
        auth_routes = auth_routes.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/auth", auth_routes)
        // Availability is readable without an account
        .nest("/rooms", rooms::public_routes())
        .nest("/bookings", bookings::public_routes())
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::protected_routes())
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .nest("/rooms", feedback::protected_routes())
        .nest("/bookings", bookings::protected_routes())
        .nest("/admin", admin::routes())
}
