//! Room reviews and problem reports from signed-in users

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::json;
use validator::Validate;

use crate::{
    api::rooms::load_room,
    db::{AuditRepository, ReportRepository, ReviewRepository},
    middleware::{AuthUser, ClientIp},
    models::{
        ActivityAction, CreateReportRequest, RoomReport, RoomReview, RoomReviews,
        SubmitReviewRequest, RESOURCE_REPORT,
    },
    utils::AppError,
    AppState,
};

/// Nested under `/rooms`, behind authentication
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}/review", post(submit_review))
        .route("/{id}/reports", post(create_report))
}

/// Visible reviews of a room with its average rating
///
/// GET /api/v1/rooms/{id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoomReviews>, AppError> {
    let room = load_room(&state, &id).await?;
    let reviews = ReviewRepository::new(&state.db)
        .list_approved(room.id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list reviews for room {}: {:#}", room.id, e);
            AppError::internal("Failed to list reviews")
        })?;

    Ok(Json(RoomReviews {
        room_id: room.id,
        average_rating: room.average_rating,
        total_reviews: room.total_reviews,
        reviews,
    }))
}

/// Create or replace the caller's review; 201 when new
///
/// POST /api/v1/rooms/{id}/review
async fn submit_review(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<(StatusCode, Json<RoomReview>), AppError> {
    payload.validate()?;
    let comment = payload
        .trimmed_comment()
        .ok_or_else(|| AppError::validation("comment: must not be empty"))?;

    let room = load_room(&state, &id).await?;
    let (review, created) = ReviewRepository::new(&state.db)
        .upsert(room.id, auth_user.id, payload.rating, comment)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save review for room {}: {:#}", room.id, e);
            AppError::internal("Failed to save review")
        })?;

    tracing::info!(room_id = %room.id, review_id = %review.id, created, "Review saved");
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(review)))
}

/// POST /api/v1/rooms/{id}/reports
async fn create_report(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Path(id): Path<String>,
    Json(payload): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<RoomReport>), AppError> {
    payload.validate()?;
    let description = payload.description.trim();
    if description.is_empty() {
        return Err(AppError::validation("description: must not be empty"));
    }

    let room = load_room(&state, &id).await?;
    let report = ReportRepository::new(&state.db)
        .insert(room.id, Some(auth_user.id), description)
        .await
        .map_err(|e| {
            tracing::error!("Failed to file report for room {}: {:#}", room.id, e);
            AppError::internal("Failed to file report")
        })?;

    tracing::info!(room_id = %room.id, report_id = %report.id, "Room problem reported");
    let ip = client_ip.as_string();
    let logged = AuditRepository::new(&state.db)
        .insert(
            Some(auth_user.id),
            ActivityAction::Create,
            RESOURCE_REPORT,
            Some(&report.id.to_string()),
            Some(&json!({ "room": room.name })),
            ip.as_deref(),
        )
        .await;
    if let Err(e) = logged {
        tracing::warn!(report_id = %report.id, "Failed to write activity log: {:#}", e);
    }

    Ok((StatusCode::CREATED, Json(report)))
}
