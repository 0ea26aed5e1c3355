//! Administrator endpoints
//!
//! Every handler checks the `admin` role before touching anything.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    api::rooms::parse_id,
    db::{
        self, AuditRepository, BookingRepository, ReportRepository, ReviewRepository,
        RoomRepository,
    },
    middleware::{AuthUser, ClientIp},
    models::{
        ActivityAction, ActivityLogEntry, ActivityLogQuery, Booking, BookingListQuery,
        BookingStatus, CreateRoomRequest, DashboardStats, ModerateReviewRequest,
        PendingCountResponse, ReportListQuery, ResolveReportRequest, ReviewListQuery, Room,
        RoomReport, RoomReview, UpdateBookingStatusRequest, UpdateRoomRequest, RESOURCE_REPORT,
        RESOURCE_REVIEW, RESOURCE_ROOM,
    },
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{id}", put(update_room).delete(delete_room))
        .route("/bookings", get(list_bookings))
        .route("/bookings/pending-count", get(pending_count))
        .route("/bookings/{id}/status", put(update_booking_status))
        .route("/bookings/{id}", delete(delete_booking))
        .route("/dashboard", get(dashboard))
        .route("/activity-logs", get(activity_logs))
        .route("/reviews", get(list_reviews))
        .route("/reviews/{id}", put(moderate_review))
        .route("/reports", get(list_reports))
        .route("/reports/{id}", put(resolve_report))
}

async fn log_activity(
    state: &AppState,
    auth_user: &AuthUser,
    ip: Option<&str>,
    action: ActivityAction,
    resource: (&str, Uuid),
    details: serde_json::Value,
) {
    let (resource_type, resource_id) = resource;
    let result = AuditRepository::new(&state.db)
        .insert(
            Some(auth_user.id),
            action,
            resource_type,
            Some(&resource_id.to_string()),
            Some(&details),
            ip,
        )
        .await;
    if let Err(e) = result {
        tracing::warn!(
            resource_type,
            resource_id = %resource_id,
            "Failed to write activity log: {:#}",
            e
        );
    }
}

fn room_write_error(e: anyhow::Error, what: &str) -> AppError {
    if db::is_unique_violation(&e) {
        AppError::conflict("A room with this name already exists")
    } else {
        tracing::error!("Failed to {} room: {:#}", what, e);
        AppError::internal(format!("Failed to {} room", what))
    }
}

/// All rooms, inactive ones included
async fn list_rooms(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Vec<Room>>, AppError> {
    auth_user.require_admin()?;

    let rooms = RoomRepository::new(&state.db).list(true).await.map_err(|e| {
        tracing::error!("Failed to list rooms: {:#}", e);
        AppError::internal("Failed to list rooms")
    })?;
    Ok(Json(rooms))
}

async fn create_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Json(payload): Json<CreateRoomRequest>,
) -> Result<(StatusCode, Json<Room>), AppError> {
    auth_user.require_admin()?;
    payload.validate()?;

    let room = RoomRepository::new(&state.db)
        .create(&payload)
        .await
        .map_err(|e| room_write_error(e, "create"))?;

    tracing::info!(room_id = %room.id, name = %room.name, "Room created");
    let ip = client_ip.as_string();
    log_activity(
        &state,
        &auth_user,
        ip.as_deref(),
        ActivityAction::Create,
        (RESOURCE_ROOM, room.id),
        json!({ "name": room.name, "capacity": room.capacity }),
    )
    .await;

    Ok((StatusCode::CREATED, Json(room)))
}

async fn update_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
    Json(payload): Json<UpdateRoomRequest>,
) -> Result<Json<Room>, AppError> {
    auth_user.require_admin()?;
    let room_id = parse_id(&id, "room")?;
    payload.validate()?;

    let room = RoomRepository::new(&state.db)
        .update(room_id, &payload)
        .await
        .map_err(|e| room_write_error(e, "update"))?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    let ip = client_ip.as_string();
    log_activity(
        &state,
        &auth_user,
        ip.as_deref(),
        ActivityAction::Update,
        (RESOURCE_ROOM, room.id),
        json!({ "changed_fields": payload.changed_fields() }),
    )
    .await;

    Ok(Json(room))
}

/// Removes the room and, by cascade, its bookings
async fn delete_room(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let room_id = parse_id(&id, "room")?;

    let repo = RoomRepository::new(&state.db);
    let room = repo
        .get_by_id(room_id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load room {}: {:#}", room_id, e);
            AppError::internal("Failed to delete room")
        })?
        .ok_or_else(|| AppError::not_found("Room not found"))?;

    let deleted = repo.delete(room_id).await.map_err(|e| {
        tracing::error!("Failed to delete room {}: {:#}", room_id, e);
        AppError::internal("Failed to delete room")
    })?;
    if !deleted {
        return Err(AppError::not_found("Room not found"));
    }

    tracing::info!(room_id = %room_id, "Room deleted");
    let ip = client_ip.as_string();
    log_activity(
        &state,
        &auth_user,
        ip.as_deref(),
        ActivityAction::Delete,
        (RESOURCE_ROOM, room.id),
        json!({ "name": room.name }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/bookings?status=&room_id=
async fn list_bookings(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    auth_user.require_admin()?;

    let bookings = BookingRepository::new(&state.db)
        .list(&query)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list bookings: {:#}", e);
            AppError::internal("Failed to list bookings")
        })?;
    Ok(Json(bookings))
}

async fn pending_count(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<PendingCountResponse>, AppError> {
    auth_user.require_admin()?;

    let pending = BookingRepository::new(&state.db)
        .count_with_status(BookingStatus::Pending)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count pending bookings: {:#}", e);
            AppError::internal("Failed to count pending bookings")
        })?;
    Ok(Json(PendingCountResponse { pending }))
}

/// PUT /api/v1/admin/bookings/{id}/status
async fn update_booking_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    auth_user.require_admin()?;
    let booking_id = parse_id(&id, "booking")?;

    let ip = client_ip.as_string();
    let booking = state
        .bookings()
        .change_status(auth_user.acting(ip.as_deref()), booking_id, payload.status)
        .await?;
    Ok(Json(booking))
}

async fn delete_booking(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;
    let booking_id = parse_id(&id, "booking")?;

    let ip = client_ip.as_string();
    state
        .bookings()
        .delete(auth_user.acting(ip.as_deref()), booking_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<DashboardStats>, AppError> {
    auth_user.require_admin()?;

    let stats = state.dashboard().stats().await.map_err(|e| {
        tracing::error!("Failed to compute dashboard statistics: {:#}", e);
        AppError::internal("Failed to load dashboard")
    })?;
    Ok(Json(stats))
}

/// GET /api/v1/admin/activity-logs?user_id=&resource_type=&action=&limit=&offset=
async fn activity_logs(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ActivityLogQuery>,
) -> Result<Json<Vec<ActivityLogEntry>>, AppError> {
    auth_user.require_admin()?;

    let entries = AuditRepository::new(&state.db)
        .list(&query)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list activity logs: {:#}", e);
            AppError::internal("Failed to list activity logs")
        })?;
    Ok(Json(entries))
}

/// GET /api/v1/admin/reviews?room_id=&approved=
async fn list_reviews(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ReviewListQuery>,
) -> Result<Json<Vec<RoomReview>>, AppError> {
    auth_user.require_admin()?;

    let reviews = ReviewRepository::new(&state.db)
        .list(&query)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reviews: {:#}", e);
            AppError::internal("Failed to list reviews")
        })?;
    Ok(Json(reviews))
}

/// Show or hide a review; the room's rating follows
///
/// PUT /api/v1/admin/reviews/{id}
async fn moderate_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
    Json(payload): Json<ModerateReviewRequest>,
) -> Result<Json<RoomReview>, AppError> {
    auth_user.require_admin()?;
    let review_id = parse_id(&id, "review")?;

    let review = ReviewRepository::new(&state.db)
        .set_approved(review_id, payload.is_approved)
        .await
        .map_err(|e| {
            tracing::error!("Failed to moderate review {}: {:#}", review_id, e);
            AppError::internal("Failed to moderate review")
        })?
        .ok_or_else(|| AppError::not_found("Review not found"))?;

    let action = if review.is_approved {
        ActivityAction::Approve
    } else {
        ActivityAction::Reject
    };
    let ip = client_ip.as_string();
    log_activity(
        &state,
        &auth_user,
        ip.as_deref(),
        action,
        (RESOURCE_REVIEW, review.id),
        json!({ "room_id": review.room_id, "rating": review.rating }),
    )
    .await;

    Ok(Json(review))
}

/// GET /api/v1/admin/reports?resolved=&room_id=
async fn list_reports(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<Vec<RoomReport>>, AppError> {
    auth_user.require_admin()?;

    let reports = ReportRepository::new(&state.db)
        .list(&query)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reports: {:#}", e);
            AppError::internal("Failed to list reports")
        })?;
    Ok(Json(reports))
}

/// PUT /api/v1/admin/reports/{id}
async fn resolve_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
    Json(payload): Json<ResolveReportRequest>,
) -> Result<Json<RoomReport>, AppError> {
    auth_user.require_admin()?;
    let report_id = parse_id(&id, "report")?;

    let report = ReportRepository::new(&state.db)
        .set_resolved(report_id, payload.is_resolved)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update report {}: {:#}", report_id, e);
            AppError::internal("Failed to update report")
        })?
        .ok_or_else(|| AppError::not_found("Report not found"))?;

    let ip = client_ip.as_string();
    log_activity(
        &state,
        &auth_user,
        ip.as_deref(),
        ActivityAction::Update,
        (RESOURCE_REPORT, report.id),
        json!({ "is_resolved": report.is_resolved }),
    )
    .await;

    Ok(Json(report))
}
