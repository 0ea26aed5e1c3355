//! Self-service profile endpoints

use axum::{extract::State, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    api::auth::{account_error, auth_service},
    db::{AuditRepository, UserRepository},
    middleware::{AuthUser, ClientIp},
    models::{ActivityAction, UpdateProfileRequest, UserPublic, RESOURCE_USER},
    utils::AppError,
    AppState,
};

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserPublic>, AppError> {
    let user = UserRepository::new(&state.db)
        .get_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(user.into()))
}

/// PUT /api/v1/profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    client_ip: ClientIp,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserPublic>, AppError> {
    payload.validate()?;

    let user = auth_service(&state)
        .update_profile(auth_user.id, &payload)
        .await
        .map_err(|e| account_error(e, "Profile update"))?;

    let ip = client_ip.as_string();
    let logged = AuditRepository::new(&state.db)
        .insert(
            Some(user.id),
            ActivityAction::Update,
            RESOURCE_USER,
            Some(&user.id.to_string()),
            Some(&json!({ "changed_fields": payload.changed_fields() })),
            ip.as_deref(),
        )
        .await;
    if let Err(e) = logged {
        tracing::warn!(user_id = %user.id, "Failed to write activity log: {:#}", e);
    }

    Ok(Json(user.into()))
}
