//! Profile and password reset tests

use chrono::{Duration, Utc};
use serde_json::json;

use smartspace::db::PasswordResetRepository;
use smartspace::models::UserRole;

use crate::common::TestApp;

const PASSWORD: &str = "Sup3r-secret-pass";

/// Register through the API so the account has a real password
async fn register(app: &TestApp, username: &str, id_number: &str) -> String {
    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({
                "username": username,
                "email": format!("{}@example.ac.id", username),
                "password": PASSWORD,
                "full_name": "Rina Wulandari",
                "id_number": id_number,
            }),
        )
        .await;
    response.assert_created();
    let json: serde_json::Value = response.json();
    json["access_token"].as_str().unwrap().to_string()
}

async fn login_status(app: &TestApp, username: &str, password: &str) -> axum::http::StatusCode {
    app.post_json(
        "/api/v1/auth/login",
        json!({ "username": username, "password": password }),
    )
    .await
    .status
}

/// Reset code from the most recent reset email to `email`
fn reset_code(app: &TestApp, email: &str) -> String {
    let messages = app.mailer.sent_to(email);
    let message = messages.last().expect("No reset email sent");
    message
        .body
        .lines()
        .find_map(|line| line.strip_prefix("Reset code: "))
        .expect("Reset email carries no code")
        .to_string()
}

#[tokio::test]
async fn test_profile_get_and_update() {
    let app = TestApp::new().await;
    let (user, token) = app.create_user(UserRole::Student).await;

    let profile: serde_json::Value = app.get_auth("/api/v1/profile", &token).await.json();
    assert_eq!(profile["username"], user.username);
    assert!(profile.get("password_hash").is_none());

    let response = app
        .put_json_auth(
            "/api/v1/profile",
            json!({
                "full_name": "Rina W.",
                "email": "rina.w@example.ac.id",
                "faculty": "Ekonomi",
                "phone": "081234567890",
            }),
            &token,
        )
        .await;
    response.assert_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["full_name"], "Rina W.");
    assert_eq!(updated["email"], "rina.w@example.ac.id");
    assert_eq!(updated["faculty"], "Ekonomi");
    assert_eq!(updated["username"], user.username);

    let me: serde_json::Value = app.get_auth("/api/v1/auth/me", &token).await.json();
    assert_eq!(me["email"], "rina.w@example.ac.id");

    app.get("/api/v1/profile").await.assert_unauthorized();
}

#[tokio::test]
async fn test_profile_rejects_taken_email_and_bad_input() {
    let app = TestApp::new().await;
    let (other, _) = app.create_user(UserRole::Lecturer).await;
    let (user, token) = app.create_user(UserRole::Student).await;

    let response = app
        .put_json_auth("/api/v1/profile", json!({ "email": other.email }), &token)
        .await;
    response.assert_conflict();

    app.put_json_auth("/api/v1/profile", json!({ "email": "not-an-email" }), &token)
        .await
        .assert_unprocessable();

    // Own address is not a conflict
    app.put_json_auth("/api/v1/profile", json!({ "email": user.email }), &token)
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_password_reset_round() {
    let app = TestApp::new().await;
    register(&app, "rina", "2110511001").await;

    let response = app
        .post_json(
            "/api/v1/auth/forgot-password",
            json!({ "email_or_id_number": "2110511001" }),
        )
        .await;
    response.assert_ok();
    let code = reset_code(&app, "rina@example.ac.id");

    let response = app
        .post_json(
            "/api/v1/auth/reset-password",
            json!({
                "token": code,
                "new_password": "Brand-new-pass-1",
                "confirm_password": "Brand-new-pass-1",
            }),
        )
        .await;
    response.assert_ok();

    assert_eq!(login_status(&app, "rina", PASSWORD).await, 401);
    assert_eq!(login_status(&app, "rina", "Brand-new-pass-1").await, 200);

    // Codes are single use
    app.post_json(
        "/api/v1/auth/reset-password",
        json!({
            "token": code,
            "new_password": "Another-pass-22",
            "confirm_password": "Another-pass-22",
        }),
    )
    .await
    .assert_bad_request();
    assert_eq!(login_status(&app, "rina", "Brand-new-pass-1").await, 200);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let app = TestApp::new().await;
    register(&app, "dimas", "2110511002").await;

    let known: serde_json::Value = app
        .post_json(
            "/api/v1/auth/forgot-password",
            json!({ "email_or_id_number": "dimas@example.ac.id" }),
        )
        .await
        .json();
    let response = app
        .post_json(
            "/api/v1/auth/forgot-password",
            json!({ "email_or_id_number": "nobody@example.ac.id" }),
        )
        .await;
    response.assert_ok();
    let unknown: serde_json::Value = response.json();
    assert_eq!(known, unknown);
    assert!(app.mailer.sent_to("nobody@example.ac.id").is_empty());

    app.post_json(
        "/api/v1/auth/forgot-password",
        json!({ "email_or_id_number": "   " }),
    )
    .await
    .assert_unprocessable();
}

#[tokio::test]
async fn test_new_reset_code_retires_the_previous_one() {
    let app = TestApp::new().await;
    register(&app, "sari", "2110511003").await;
    let request = json!({ "email_or_id_number": "sari@example.ac.id" });

    app.post_json("/api/v1/auth/forgot-password", request.clone())
        .await
        .assert_ok();
    let first = reset_code(&app, "sari@example.ac.id");
    app.post_json("/api/v1/auth/forgot-password", request)
        .await
        .assert_ok();
    let second = reset_code(&app, "sari@example.ac.id");
    assert_ne!(first, second);

    let body = |token: &str| {
        json!({
            "token": token,
            "new_password": "Fresh-pass-333",
            "confirm_password": "Fresh-pass-333",
        })
    };
    app.post_json("/api/v1/auth/reset-password", body(&first))
        .await
        .assert_bad_request();
    app.post_json("/api/v1/auth/reset-password", body(&second))
        .await
        .assert_ok();
}

#[tokio::test]
async fn test_reset_rejects_expired_code_and_weak_passwords() {
    let app = TestApp::new().await;
    register(&app, "yoga", "2110511004").await;

    let user = smartspace::db::UserRepository::new(&app.state.db)
        .get_by_username("yoga")
        .await
        .unwrap()
        .unwrap();
    PasswordResetRepository::new(&app.state.db)
        .issue(user.id, "expired-code", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    app.post_json(
        "/api/v1/auth/reset-password",
        json!({
            "token": "expired-code",
            "new_password": "Fresh-pass-333",
            "confirm_password": "Fresh-pass-333",
        }),
    )
    .await
    .assert_bad_request();

    app.post_json(
        "/api/v1/auth/forgot-password",
        json!({ "email_or_id_number": "yoga@example.ac.id" }),
    )
    .await
    .assert_ok();
    let code = reset_code(&app, "yoga@example.ac.id");

    let response = app
        .post_json(
            "/api/v1/auth/reset-password",
            json!({ "token": code, "new_password": "short", "confirm_password": "short" }),
        )
        .await;
    response.assert_unprocessable();

    let response = app
        .post_json(
            "/api/v1/auth/reset-password",
            json!({
                "token": code,
                "new_password": "Fresh-pass-333",
                "confirm_password": "Fresh-pass-334",
            }),
        )
        .await;
    response.assert_unprocessable();
    let json: serde_json::Value = response.json();
    assert_eq!(json["details"]["errors"][0], "confirm_password: passwords do not match");

    // Rejected attempts do not spend the code
    app.post_json(
        "/api/v1/auth/reset-password",
        json!({
            "token": code,
            "new_password": "Fresh-pass-333",
            "confirm_password": "Fresh-pass-333",
        }),
    )
    .await
    .assert_ok();
    assert_eq!(login_status(&app, "yoga", "Fresh-pass-333").await, 200);
}
