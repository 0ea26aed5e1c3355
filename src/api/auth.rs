//! Authentication API endpoints
//!
//! Provides login, token refresh, registration, password reset and the
//! current-user lookup.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    db::UserRepository,
    middleware::auth::{
        create_access_token, create_refresh_token, validate_token, AuthUser, TokenType,
    },
    models::{
        AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RefreshTokenRequest,
        RegisterRequest, ResetPasswordRequest, TokenResponse, User, UserPublic,
    },
    services::{AccountError, AuthService},
    utils::AppError,
    AppState,
};

/// Create public routes for authentication endpoints (no auth required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
        .route("/register", post(register))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

/// Same answer whether or not the account exists
const RESET_REQUESTED_MESSAGE: &str =
    "If the account exists, a password reset code has been sent to its email address.";

/// Create protected routes for authentication endpoints (auth required)
pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_current_user))
}

pub(crate) fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(state.db.clone(), state.config.auth.password_min_length)
}

pub(crate) fn account_error(e: AccountError, what: &str) -> AppError {
    match e {
        AccountError::UsernameTaken | AccountError::EmailTaken | AccountError::IdNumberTaken => {
            AppError::conflict(e.to_string())
        }
        AccountError::Invalid(message) => AppError::validation(message),
        AccountError::NotFound => AppError::not_found(e.to_string()),
        AccountError::InvalidResetToken => AppError::bad_request(e.to_string()),
        AccountError::Other(e) => {
            tracing::error!("{} failed: {:#}", what, e);
            AppError::internal(format!("{} failed", what))
        }
    }
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, AppError> {
    let auth = &state.config.auth;
    let access_token = create_access_token(&user, &auth.jwt_secret, auth.token_expiry_hours)
        .map_err(|e| AppError::internal(format!("Failed to create access token: {}", e)))?;
    let refresh_token =
        create_refresh_token(&user, &auth.jwt_secret, auth.refresh_token_expiry_days)
            .map_err(|e| AppError::internal(format!("Failed to create refresh token: {}", e)))?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: auth.token_expiry_hours * 3600,
        user: user.into(),
    })
}

/// Login handler
///
/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = auth_service(&state)
        .authenticate(&payload.username, &payload.password)
        .await
        .map_err(|e| {
            tracing::error!("Authentication failed: {:#}", e);
            AppError::internal("Authentication failed")
        })?
        .ok_or_else(|| AppError::unauthorized("Invalid username or password"))?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

/// Exchange a refresh token for a new access token
///
/// POST /api/v1/auth/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let token_data = validate_token(&payload.refresh_token, &state.config.auth.jwt_secret)
        .map_err(|_| AppError::unauthorized("Invalid or expired refresh token"))?;

    if token_data.claims.token_type != TokenType::Refresh {
        return Err(AppError::unauthorized("Invalid token type"));
    }

    let user_id = uuid::Uuid::parse_str(&token_data.claims.sub)
        .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;

    // The account may have been removed since the token was issued.
    let user = UserRepository::new(&state.db)
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    let access_token = create_access_token(
        &user,
        &state.config.auth.jwt_secret,
        state.config.auth.token_expiry_hours,
    )
    .map_err(|e| AppError::internal(format!("Failed to create access token: {}", e)))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.config.auth.token_expiry_hours * 3600,
    }))
}

/// Self-service registration
///
/// POST /api/v1/auth/register
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.validate()?;

    let user = auth_service(&state)
        .register(&payload)
        .await
        .map_err(|e| account_error(e, "Registration"))?;

    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

/// Email a reset code to the account with this email or ID number
///
/// POST /api/v1/auth/forgot-password
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    if payload.email_or_id_number.trim().is_empty() {
        return Err(AppError::validation(
            "email_or_id_number: enter an email address or ID number",
        ));
    }

    let valid_for = chrono::Duration::minutes(state.config.auth.password_reset_expiry_minutes);
    let issued = auth_service(&state)
        .request_password_reset(&payload.email_or_id_number, valid_for)
        .await
        .map_err(|e| {
            tracing::error!("Password reset request failed: {:#}", e);
            AppError::internal("Password reset request failed")
        })?;

    if let Some((user, token, expires_at)) = issued {
        state.notifier.password_reset(&user, &token, expires_at).await;
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// POST /api/v1/auth/reset-password
async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    auth_service(&state)
        .reset_password(&payload)
        .await
        .map_err(|e| account_error(e, "Password reset"))?;

    Ok(Json(MessageResponse::new(
        "Password has been reset. Sign in with the new password.",
    )))
}

/// Get current user handler
///
/// GET /api/v1/auth/me
async fn get_current_user(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<UserPublic>, AppError> {
    let user = UserRepository::new(&state.db)
        .get_by_id(auth_user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(user.into()))
}
