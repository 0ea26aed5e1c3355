//! Booking endpoints
//!
//! The conflict check is public so the booking form can validate a slot
//! before the user signs in; everything else needs a bearer token.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use crate::{
    api::rooms::{load_room, parse_id},
    db::BookingRepository,
    middleware::{AuthUser, ClientIp},
    models::{
        Booking, ConflictCheckRequest, ConflictCheckResponse, CreateBookingRequest,
        MyBookingsResponse, TimeSpan,
    },
    utils::AppError,
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/check-conflict", post(check_conflict))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/mine", get(my_bookings))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", post(cancel_booking))
}

/// Pre-submission availability check; a conflict is a normal result here
///
/// POST /api/v1/bookings/check-conflict
async fn check_conflict(
    State(state): State<AppState>,
    Json(payload): Json<ConflictCheckRequest>,
) -> Result<Json<ConflictCheckResponse>, AppError> {
    let start = state
        .timezone
        .parse_timestamp(&payload.start_time)
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let end = state
        .timezone
        .parse_timestamp(&payload.end_time)
        .map_err(|e| AppError::bad_request(e.to_string()))?;
    let span = TimeSpan::new(start, end).map_err(|e| AppError::bad_request(e.to_string()))?;

    let room = load_room(&state, &payload.room_id.to_string()).await?;
    let response = state
        .availability()
        .check_conflict(room.id, &span, payload.exclude_booking_id)
        .await
        .map_err(|e| {
            tracing::error!("Conflict check failed for room {}: {:#}", room.id, e);
            AppError::internal("Failed to check availability")
        })?;

    Ok(Json(response))
}

/// POST /api/v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let ip = client_ip.as_string();
    let booking = state
        .bookings()
        .create(auth_user.acting(ip.as_deref()), &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Own bookings, newest first, with per-status counts
///
/// GET /api/v1/bookings/mine
async fn my_bookings(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MyBookingsResponse>, AppError> {
    let repo = BookingRepository::new(&state.db);
    let bookings = repo.list_for_user(auth_user.id).await.map_err(|e| {
        tracing::error!("Failed to list bookings for {}: {:#}", auth_user.id, e);
        AppError::internal("Failed to list bookings")
    })?;
    let counts = repo
        .status_counts_for_user(auth_user.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count bookings for {}: {:#}", auth_user.id, e);
            AppError::internal("Failed to list bookings")
        })?;

    Ok(Json(MyBookingsResponse { bookings, counts }))
}

/// GET /api/v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = parse_id(&id, "booking")?;
    let booking = state.bookings().get(booking_id).await?;

    // Other users' bookings are indistinguishable from missing ones.
    if booking.user_id != auth_user.id && !auth_user.is_admin() {
        return Err(AppError::not_found("Booking not found"));
    }

    Ok(Json(booking))
}

/// POST /api/v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let booking_id = parse_id(&id, "booking")?;
    let ip = client_ip.as_string();
    let booking = state
        .bookings()
        .cancel_own(auth_user.acting(ip.as_deref()), booking_id)
        .await?;

    Ok(Json(booking))
}
