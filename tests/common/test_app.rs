//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! over a temporary SQLite file, with a recording mailer.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use chrono::{DateTime, Utc};
use tower::ServiceExt;
use uuid::Uuid;

use smartspace::{
    api,
    config::{AdminConfig, AppConfig, DatabaseConfig, ReminderConfig},
    db::{self, booking_repository, RoomRepository, UserRepository},
    middleware::auth::create_access_token,
    models::{BookingStatus, CreateRoomRequest, NewBooking, Room, TimeSpan, User, UserRole},
    AppState,
};

use super::factories::UserFactory;
use super::mocks::RecordingMailer;

/// Extra address that always belongs to the administrator group in tests
pub const ADMIN_GROUP_EMAIL: &str = "sarpras@example.ac.id";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    users: UserFactory,
}

impl TestApp {
    /// Create a new test application with a fresh database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let mailer = Arc::new(RecordingMailer::new());
        let state = AppState::build(config, db, mailer.clone())
            .await
            .expect("Failed to build application state");

        // Same layout as the server, without rate limiting
        let router = Router::new()
            .nest("/api/v1", api::public_routes(None))
            .nest(
                "/api/v1",
                api::protected_routes().layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    smartspace::middleware::auth::auth_middleware,
                )),
            )
            .with_state(state.clone());

        Self {
            router,
            state,
            mailer,
            users: UserFactory::new(),
        }
    }

    /// Insert a user and mint an access token for it
    pub async fn create_user(&self, role: UserRole) -> (User, String) {
        let user = self.users.build(role);
        UserRepository::new(&self.state.db)
            .insert(&user)
            .await
            .expect("Failed to insert test user");
        let token = create_access_token(&user, &self.state.config.auth.jwt_secret, 1)
            .expect("Failed to create test token");
        (user, token)
    }

    pub async fn create_room(&self, request: CreateRoomRequest) -> Room {
        RoomRepository::new(&self.state.db)
            .create(&request)
            .await
            .expect("Failed to insert test room")
    }

    /// Local wall-clock timestamp as an instant
    pub fn instant(&self, local: &str) -> DateTime<Utc> {
        self.state
            .timezone
            .parse_timestamp(local)
            .expect("Invalid test timestamp")
    }

    /// Store a booking directly, bypassing submission rules such as the
    /// past-start check; used for historical scenarios
    pub async fn insert_booking(
        &self,
        room: &Room,
        user: &User,
        start: &str,
        end: &str,
        status: BookingStatus,
        purpose: &str,
    ) -> Uuid {
        let span = TimeSpan::new(self.instant(start), self.instant(end)).expect("Invalid span");
        let id = booking_repository::insert(
            &self.state.db,
            &NewBooking {
                room_id: room.id,
                user_id: user.id,
                span,
                guest_count: 5,
                purpose: purpose.to_string(),
                document: None,
            },
        )
        .await
        .expect("Failed to insert test booking");

        if status != BookingStatus::Pending {
            booking_repository::update_status(&self.state.db, id, BookingStatus::Pending, status)
                .await
                .expect("Failed to set test booking status");
        }
        id
    }

    /// Make a GET request to the test application
    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> TestResponse {
        self.request(json_request("POST", uri, body)).await
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.request_with_auth(request, token).await
    }

    pub async fn post_json_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request_with_auth(json_request("POST", uri, body), token)
            .await
    }

    pub async fn put_json_auth(
        &self,
        uri: &str,
        body: serde_json::Value,
        token: &str,
    ) -> TestResponse {
        self.request_with_auth(json_request("PUT", uri, body), token)
            .await
    }

    pub async fn delete_auth(&self, uri: &str, token: &str) -> TestResponse {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.request_with_auth(request, token).await
    }

    /// Make a request with authentication
    pub async fn request_with_auth(&self, request: Request<Body>, token: &str) -> TestResponse {
        let (mut parts, body) = request.into_parts();
        parts.headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        self.request(Request::from_parts(parts, body)).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    /// Assert the response status is Created (201)
    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    /// Assert the response status is Bad Request (400)
    pub fn assert_bad_request(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::BAD_REQUEST)
    }

    /// Assert the response status is Unauthorized (401)
    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    /// Assert the response status is Forbidden (403)
    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    /// Assert the response status is Not Found (404)
    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }

    /// Assert the response status is Conflict (409)
    pub fn assert_conflict(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CONFLICT)
    }

    /// Assert the response status is Unprocessable Entity (422)
    pub fn assert_unprocessable(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY)
    }
}

/// Create a test configuration with temporary SQLite database
pub fn test_config() -> AppConfig {
    // Use a unique temp file for each test to avoid conflicts
    let db_path = std::env::temp_dir().join(format!(
        "smartspace_test_{}.db",
        Uuid::new_v4().simple()
    ));

    let mut config = AppConfig::default();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 30,
        idle_timeout_secs: 600,
    };
    config.auth.jwt_secret = "test_secret_key_that_is_at_least_32_bytes_long".to_string();
    config.reminders = ReminderConfig {
        enabled: false,
        ..ReminderConfig::default()
    };
    config.admin = AdminConfig {
        notify_emails: vec![ADMIN_GROUP_EMAIL.to_string()],
    };
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_creation() {
        let app = TestApp::new().await;
        assert_eq!(app.state.timezone.offset().local_minus_utc(), 7 * 3600);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get("/api/v1/health").await;
        response.assert_ok();
    }
}
