//! Booking lifecycle tests

use std::collections::HashSet;

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::json;

use smartspace::models::{BookingStatus, UserRole};

use crate::common::{at, booking_request, RoomFixtures, TestApp, ADMIN_GROUP_EMAIL, FUTURE_DAY};

#[tokio::test]
async fn test_create_booking_returns_pending_booking() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (user, token) = app.create_user(UserRole::Student).await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "11:00")),
            &token,
        )
        .await;
    response.assert_created();

    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "Pending");
    assert_eq!(json["room_id"], room.id.to_string());
    assert_eq!(json["room_name"], "Lab Komputer 1");
    assert_eq!(json["user_id"], user.id.to_string());
    assert_eq!(json["guest_count"], 10);
    assert_eq!(json["document_name"], "proposal.pdf");
    // 09:00 local at +07:00
    assert_eq!(json["starts_at"], "2030-06-10T02:00:00Z");
}

#[tokio::test]
async fn test_submission_notifies_requester_and_admin_group() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (user, token) = app.create_user(UserRole::Student).await;

    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
        &token,
    )
    .await
    .assert_created();

    let to_user = app.mailer.sent_to(&user.email);
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].subject.contains("Booking request received"));
    assert!(to_user[0].body.contains("Lab Komputer 1"));

    let to_admins = app.mailer.sent_to(ADMIN_GROUP_EMAIL);
    assert_eq!(to_admins.len(), 1);
    assert!(to_admins[0].subject.contains("New booking to review"));
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_the_request() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    app.mailer.fail_deliveries(true);

    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
        &token,
    )
    .await
    .assert_created();
    assert!(app.mailer.sent().is_empty());
}

#[tokio::test]
async fn test_adjacent_bookings_are_both_accepted() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;

    for (start, end) in [("09:00", "10:00"), ("10:00", "11:00")] {
        app.post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, start), &at(FUTURE_DAY, end)),
            &token,
        )
        .await
        .assert_created();
    }
}

#[tokio::test]
async fn test_overlapping_booking_is_rejected_with_conflict_details() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (owner, _) = app.create_user(UserRole::Lecturer).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    let existing = app
        .insert_booking(
            &room,
            &owner,
            &at(FUTURE_DAY, "10:30"),
            &at(FUTURE_DAY, "11:30"),
            BookingStatus::Approved,
            "Sidang skripsi",
        )
        .await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "10:00"), &at(FUTURE_DAY, "11:00")),
            &token,
        )
        .await;
    response.assert_conflict();

    let json: serde_json::Value = response.json();
    assert_eq!(json["code"], "booking_conflict");
    assert_eq!(json["details"]["conflict"]["id"], existing.to_string());
    assert_eq!(json["details"]["conflict"]["start_time"], "10:30");
    assert_eq!(json["details"]["conflict"]["end_time"], "11:30");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Slot 10:30-11:30 on 10 Jun 2030"));
}

#[tokio::test]
async fn test_released_slot_can_be_booked_again() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (owner, _) = app.create_user(UserRole::Student).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    app.insert_booking(
        &room,
        &owner,
        &at(FUTURE_DAY, "09:00"),
        &at(FUTURE_DAY, "11:00"),
        BookingStatus::Rejected,
        "Ditolak",
    )
    .await;

    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(room.id, &at(FUTURE_DAY, "09:30"), &at(FUTURE_DAY, "10:30")),
        &token,
    )
    .await
    .assert_created();
}

#[tokio::test]
async fn test_same_slot_in_another_room_is_free() {
    let app = TestApp::new().await;
    let lab = app.create_room(RoomFixtures::lab()).await;
    let hall = app.create_room(RoomFixtures::hall()).await;
    let (_, token) = app.create_user(UserRole::Staff).await;

    for room in [&lab, &hall] {
        app.post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "13:00"), &at(FUTURE_DAY, "15:00")),
            &token,
        )
        .await
        .assert_created();
    }
}

#[tokio::test]
async fn test_concurrent_submissions_for_one_slot_admit_exactly_one() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::hall()).await;

    let mut tokens = Vec::new();
    for _ in 0..8 {
        let (_, token) = app.create_user(UserRole::Student).await;
        tokens.push(token);
    }

    let responses = join_all(tokens.iter().map(|token| {
        app.post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "08:00"), &at(FUTURE_DAY, "12:00")),
            token,
        )
    }))
    .await;

    let created = responses
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);

    for response in responses.iter().filter(|r| r.status != StatusCode::CREATED) {
        response.assert_conflict();
        let json: serde_json::Value = response.json();
        let code = json["code"].as_str().unwrap();
        assert!(
            code == "booking_conflict" || code == "slot_unavailable",
            "unexpected code {}",
            code
        );
    }

    let day: serde_json::Value = app
        .get(&format!(
            "/api/v1/rooms/{}/booked-slots/{}?include_pending=true",
            room.id, FUTURE_DAY
        ))
        .await
        .json();
    assert_eq!(day["total_bookings"], 1);
}

#[tokio::test]
async fn test_concurrent_approve_and_owner_cancel_apply_exactly_one() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (owner, owner_token) = app.create_user(UserRole::Student).await;
    let (_, admin_token) = app.create_user(UserRole::Admin).await;

    for hour in ["08", "10", "12", "14", "16"] {
        let start = format!("{}:00", hour);
        let end = format!("{}:30", hour);
        let id = app
            .insert_booking(
                &room,
                &owner,
                &at(FUTURE_DAY, &start),
                &at(FUTURE_DAY, &end),
                BookingStatus::Pending,
                "Race",
            )
            .await;

        let approve_path = format!("/api/v1/admin/bookings/{}/status", id);
        let cancel_path = format!("/api/v1/bookings/{}/cancel", id);
        let (approve, cancel) = tokio::join!(
            app.put_json_auth(
                &approve_path,
                json!({ "status": "Approved" }),
                &admin_token,
            ),
            app.post_json_auth(
                &cancel_path,
                json!({}),
                &owner_token,
            ),
        );

        let (winner, loser, expected) = match (approve.status, cancel.status) {
            (StatusCode::OK, _) => (&approve, &cancel, "Approved"),
            (_, StatusCode::OK) => (&cancel, &approve, "Cancelled"),
            (a, c) => panic!("neither change applied: approve {} cancel {}", a, c),
        };
        winner.assert_ok();
        loser.assert_conflict();
        let error: serde_json::Value = loser.json();
        assert_eq!(error["code"], "invalid_transition");

        let stored: serde_json::Value = app
            .get_auth(&format!("/api/v1/bookings/{}", id), &owner_token)
            .await
            .json();
        assert_eq!(stored["status"], expected);
    }
}

#[tokio::test]
async fn test_concurrent_submissions_for_disjoint_slots_all_succeed() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Staff).await;

    let hours = ["08:00", "09:00", "10:00", "11:00", "12:00"];
    let responses = join_all(hours.windows(2).map(|pair| {
        app.post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, pair[0]), &at(FUTURE_DAY, pair[1])),
            &token,
        )
    }))
    .await;

    for response in &responses {
        response.assert_created();
    }
    let ids: HashSet<String> = responses
        .iter()
        .map(|r| r.json::<serde_json::Value>()["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_invalid_request_reports_every_violation() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            json!({
                "room_id": room.id,
                "start_time": at(FUTURE_DAY, "11:00"),
                "end_time": at(FUTURE_DAY, "10:00"),
                "guest_count": 41,
                "purpose": "x".repeat(1001),
                "document": { "file_name": "proposal.exe", "size_bytes": 10_000_000 },
            }),
            &token,
        )
        .await;
    response.assert_unprocessable();

    let json: serde_json::Value = response.json();
    let errors: Vec<String> = json["details"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap().to_string())
        .collect();
    for field in ["end_time", "guest_count", "purpose", "document"] {
        assert!(
            errors.iter().any(|e| e.starts_with(field)),
            "missing {} in {:?}",
            field,
            errors
        );
    }
    // One error for the file type, one for the size
    assert_eq!(errors.iter().filter(|e| e.starts_with("document")).count(), 2);
}

#[tokio::test]
async fn test_missing_document_and_zero_guests_are_rejected() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;

    let mut body = booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00"));
    body["guest_count"] = json!(0);
    body.as_object_mut().unwrap().remove("document");

    let response = app.post_json_auth("/api/v1/bookings", body, &token).await;
    response.assert_unprocessable();
    let json: serde_json::Value = response.json();
    let errors = json["details"]["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
}

#[tokio::test]
async fn test_start_in_the_past_is_rejected() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, "2020-01-06T09:00", "2020-01-06T10:00"),
            &token,
        )
        .await;
    response.assert_unprocessable();
    assert!(response.text().contains("must not be in the past"));
}

#[tokio::test]
async fn test_years_beyond_four_digits_are_rejected_and_lists_stay_readable() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    let (_, admin_token) = app.create_user(UserRole::Admin).await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, "+12345-01-01T09:00", "+12345-01-01T11:00"),
            &token,
        )
        .await;
    response.assert_unprocessable();
    let json: serde_json::Value = response.json();
    let errors = json["details"]["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e == "start_time: invalid timestamp"));
    assert!(errors.iter().any(|e| e == "end_time: invalid timestamp"));

    app.get_auth("/api/v1/bookings/mine", &token).await.assert_ok();
    let all: Vec<serde_json::Value> = app
        .get_auth("/api/v1/admin/bookings", &admin_token)
        .await
        .json();
    assert!(all.is_empty());

    app.get(&format!("/api/v1/rooms/{}/booked-slots/+12345-01-01", room.id))
        .await
        .assert_bad_request();
}

#[tokio::test]
async fn test_room_under_maintenance_cannot_be_booked() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::under_maintenance()).await;
    let (_, token) = app.create_user(UserRole::Student).await;

    let response = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
            &token,
        )
        .await;
    response.assert_bad_request();
    let json: serde_json::Value = response.json();
    assert!(json["message"].as_str().unwrap().contains("not open for booking"));
}

#[tokio::test]
async fn test_booking_unknown_room_returns_404() {
    let app = TestApp::new().await;
    let (_, token) = app.create_user(UserRole::Student).await;

    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(
            uuid::Uuid::new_v4(),
            &at(FUTURE_DAY, "09:00"),
            &at(FUTURE_DAY, "10:00"),
        ),
        &token,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_my_bookings_lists_own_bookings_with_counts() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (user, token) = app.create_user(UserRole::Student).await;
    let (other, _) = app.create_user(UserRole::Student).await;

    app.insert_booking(
        &room,
        &user,
        "2025-03-03T08:00",
        "2025-03-03T09:00",
        BookingStatus::Approved,
        "Old",
    )
    .await;
    app.insert_booking(
        &room,
        &user,
        "2025-03-04T08:00",
        "2025-03-04T09:00",
        BookingStatus::Rejected,
        "Rejected",
    )
    .await;
    app.insert_booking(
        &room,
        &other,
        "2025-03-05T08:00",
        "2025-03-05T09:00",
        BookingStatus::Approved,
        "Someone else",
    )
    .await;
    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
        &token,
    )
    .await
    .assert_created();

    let response = app.get_auth("/api/v1/bookings/mine", &token).await;
    response.assert_ok();

    let json: serde_json::Value = response.json();
    let bookings = json["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 3);
    assert!(bookings
        .iter()
        .all(|b| b["user_id"] == user.id.to_string()));
    assert_eq!(json["counts"]["total"], 3);
    assert_eq!(json["counts"]["pending"], 1);
    assert_eq!(json["counts"]["approved"], 1);
    assert_eq!(json["counts"]["rejected"], 1);
}

#[tokio::test]
async fn test_other_users_booking_is_hidden() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (owner, owner_token) = app.create_user(UserRole::Student).await;
    let (_, stranger_token) = app.create_user(UserRole::Student).await;
    let (_, admin_token) = app.create_user(UserRole::Admin).await;
    let id = app
        .insert_booking(
            &room,
            &owner,
            &at(FUTURE_DAY, "09:00"),
            &at(FUTURE_DAY, "10:00"),
            BookingStatus::Pending,
            "Private",
        )
        .await;
    let uri = format!("/api/v1/bookings/{}", id);

    app.get_auth(&uri, &owner_token).await.assert_ok();
    app.get_auth(&uri, &admin_token).await.assert_ok();
    app.get_auth(&uri, &stranger_token).await.assert_not_found();

    app.post_json_auth(&format!("{}/cancel", uri), json!({}), &stranger_token)
        .await
        .assert_not_found();

    let booking: serde_json::Value = app.get_auth(&uri, &owner_token).await.json();
    assert_eq!(booking["status"], "Pending");
}

#[tokio::test]
async fn test_owner_cancels_pending_booking_and_frees_the_slot() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    let (_, other_token) = app.create_user(UserRole::Student).await;

    let created: serde_json::Value = app
        .post_json_auth(
            "/api/v1/bookings",
            booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
            &token,
        )
        .await
        .json();
    let id = created["id"].as_str().unwrap();

    let response = app
        .post_json_auth(&format!("/api/v1/bookings/{}/cancel", id), json!({}), &token)
        .await;
    response.assert_ok();
    let json: serde_json::Value = response.json();
    assert_eq!(json["status"], "Cancelled");

    app.post_json_auth(
        "/api/v1/bookings",
        booking_request(room.id, &at(FUTURE_DAY, "09:00"), &at(FUTURE_DAY, "10:00")),
        &other_token,
    )
    .await
    .assert_created();
}

#[tokio::test]
async fn test_owner_cannot_cancel_an_approved_booking() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (user, token) = app.create_user(UserRole::Student).await;
    let id = app
        .insert_booking(
            &room,
            &user,
            &at(FUTURE_DAY, "09:00"),
            &at(FUTURE_DAY, "10:00"),
            BookingStatus::Approved,
            "Approved already",
        )
        .await;

    let response = app
        .post_json_auth(&format!("/api/v1/bookings/{}/cancel", id), json!({}), &token)
        .await;
    response.assert_conflict();
    let json: serde_json::Value = response.json();
    assert_eq!(json["code"], "invalid_transition");

    let booking: serde_json::Value = app
        .get_auth(&format!("/api/v1/bookings/{}", id), &token)
        .await
        .json();
    assert_eq!(booking["status"], "Approved");
}

#[tokio::test]
async fn test_cancelling_twice_is_an_invalid_transition() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (user, token) = app.create_user(UserRole::Student).await;
    let id = app
        .insert_booking(
            &room,
            &user,
            &at(FUTURE_DAY, "09:00"),
            &at(FUTURE_DAY, "10:00"),
            BookingStatus::Pending,
            "Twice",
        )
        .await;
    let uri = format!("/api/v1/bookings/{}/cancel", id);

    app.post_json_auth(&uri, json!({}), &token).await.assert_ok();
    let response = app.post_json_auth(&uri, json!({}), &token).await;
    response.assert_conflict();
    let json: serde_json::Value = response.json();
    assert_eq!(json["code"], "invalid_transition");
}
