//! Room catalogue and availability endpoints (public)

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::{
    db::RoomRepository,
    models::{CalendarQuery, DaySlots, DaySlotsQuery, MonthCalendar, Room, RoomListQuery},
    utils::{time::SUPPORTED_YEARS, AppError},
    AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rooms))
        .route("/{id}", get(get_room))
        .route("/{id}/calendar", get(month_calendar))
        .route("/{id}/booked-slots/{date}", get(booked_slots))
        .route("/{id}/reviews", get(super::feedback::list_reviews))
}

pub(crate) fn parse_id(value: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value).map_err(|_| AppError::bad_request(format!("Invalid {} ID", what)))
}

pub(crate) async fn load_room(state: &AppState, id: &str) -> Result<Room, AppError> {
    let room_id = parse_id(id, "room")?;
    RoomRepository::new(&state.db)
        .get_by_id(room_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load room {}: {:#}", room_id, e);
            AppError::internal("Failed to load room")
        })?
        .ok_or_else(|| AppError::not_found("Room not found"))
}

/// GET /api/v1/rooms
async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<RoomListQuery>,
) -> Result<Json<Vec<Room>>, AppError> {
    let rooms = RoomRepository::new(&state.db)
        .list(query.include_inactive)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list rooms: {:#}", e);
            AppError::internal("Failed to list rooms")
        })?;

    Ok(Json(rooms))
}

/// GET /api/v1/rooms/{id}
async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Room>, AppError> {
    Ok(Json(load_room(&state, &id).await?))
}

/// Approved bookings of one local month
///
/// GET /api/v1/rooms/{id}/calendar?year=&month=
async fn month_calendar(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<MonthCalendar>, AppError> {
    let (current_year, current_month) = state.timezone.current_month();
    let year = query.year.unwrap_or(current_year);
    let month = query.month.unwrap_or(current_month);

    let mut errors = Vec::new();
    if !SUPPORTED_YEARS.contains(&year) {
        errors.push(format!("year: must be a four-digit year, got {}", year));
    }
    if !(1..=12).contains(&month) {
        errors.push(format!("month: must be between 1 and 12, got {}", month));
    }
    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }

    let room = load_room(&state, &id).await?;
    let calendar = state
        .availability()
        .month_calendar(&room, year, month)
        .await
        .map_err(|e| {
            tracing::error!("Failed to build calendar for room {}: {:#}", room.id, e);
            AppError::internal("Failed to load calendar")
        })?;

    Ok(Json(calendar))
}

/// Occupied intervals of one local day
///
/// GET /api/v1/rooms/{id}/booked-slots/{YYYY-MM-DD}?include_pending=
async fn booked_slots(
    State(state): State<AppState>,
    Path((id, date)): Path<(String, String)>,
    Query(query): Query<DaySlotsQuery>,
) -> Result<Json<DaySlots>, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .ok()
        .filter(|d| SUPPORTED_YEARS.contains(&d.year()))
        .ok_or_else(|| AppError::bad_request("Invalid date format, expected YYYY-MM-DD"))?;

    let room = load_room(&state, &id).await?;
    let slots = state
        .availability()
        .booked_slots(&room, date, query.include_pending)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load booked slots for room {}: {:#}", room.id, e);
            AppError::internal("Failed to load booked slots")
        })?;

    Ok(Json(slots))
}
