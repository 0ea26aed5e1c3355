//! Room review and problem report tests

use serde_json::json;

use smartspace::models::UserRole;

use crate::common::{RoomFixtures, TestApp};

#[tokio::test]
async fn test_reviews_average_and_resubmission_replaces() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, first) = app.create_user(UserRole::Student).await;
    let (_, second) = app.create_user(UserRole::Lecturer).await;
    let uri = format!("/api/v1/rooms/{}/review", room.id);

    let response = app
        .post_json_auth(&uri, json!({ "rating": 5, "comment": "Great projector" }), &first)
        .await;
    response.assert_created();
    let review: serde_json::Value = response.json();
    assert_eq!(review["rating"], 5);
    assert!(review["user_initial"].as_str().unwrap().len() == 1);

    app.post_json_auth(&uri, json!({ "rating": 4, "comment": "Comfortable" }), &second)
        .await
        .assert_created();

    // Second submission by the same user replaces the first
    app.post_json_auth(&uri, json!({ "rating": 2, "comment": "  AC broken today " }), &first)
        .await
        .assert_ok();

    let listing: serde_json::Value = app
        .get(&format!("/api/v1/rooms/{}/reviews", room.id))
        .await
        .json();
    assert_eq!(listing["total_reviews"], 2);
    assert_eq!(listing["average_rating"], 3.0);
    let reviews = listing["reviews"].as_array().unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().any(|r| r["comment"] == "AC broken today"));

    let room_json: serde_json::Value = app.get(&format!("/api/v1/rooms/{}", room.id)).await.json();
    assert_eq!(room_json["total_reviews"], 2);
    assert_eq!(room_json["average_rating"], 3.0);
}

#[tokio::test]
async fn test_average_rating_rounds_to_one_decimal() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::hall()).await;
    let uri = format!("/api/v1/rooms/{}/review", room.id);

    for rating in [5, 4, 4] {
        let (_, token) = app.create_user(UserRole::Student).await;
        app.post_json_auth(&uri, json!({ "rating": rating, "comment": "ok" }), &token)
            .await
            .assert_created();
    }

    let listing: serde_json::Value = app
        .get(&format!("/api/v1/rooms/{}/reviews", room.id))
        .await
        .json();
    assert_eq!(listing["average_rating"], 4.3);
    assert_eq!(listing["total_reviews"], 3);
}

#[tokio::test]
async fn test_invalid_reviews_are_rejected() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, token) = app.create_user(UserRole::Student).await;
    let uri = format!("/api/v1/rooms/{}/review", room.id);

    for rating in [0, 6] {
        let response = app
            .post_json_auth(&uri, json!({ "rating": rating, "comment": "x" }), &token)
            .await;
        response.assert_unprocessable();
        let json: serde_json::Value = response.json();
        assert_eq!(json["details"]["errors"][0], "rating: rating must be between 1 and 5");
    }

    app.post_json_auth(&uri, json!({ "rating": 3, "comment": "   " }), &token)
        .await
        .assert_unprocessable();

    app.post_json(&uri, json!({ "rating": 3, "comment": "anonymous" }))
        .await
        .assert_unauthorized();

    app.post_json_auth(
        &format!("/api/v1/rooms/{}/review", uuid::Uuid::new_v4()),
        json!({ "rating": 3, "comment": "ghost room" }),
        &token,
    )
    .await
    .assert_not_found();

    let listing: serde_json::Value = app
        .get(&format!("/api/v1/rooms/{}/reviews", room.id))
        .await
        .json();
    assert_eq!(listing["total_reviews"], 0);
    assert_eq!(listing["average_rating"], 0.0);
}

#[tokio::test]
async fn test_hidden_reviews_leave_the_average() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (_, admin) = app.create_user(UserRole::Admin).await;
    let (_, fair) = app.create_user(UserRole::Student).await;
    let (_, spam) = app.create_user(UserRole::Student).await;
    let uri = format!("/api/v1/rooms/{}/review", room.id);

    app.post_json_auth(&uri, json!({ "rating": 4, "comment": "Clean" }), &fair)
        .await
        .assert_created();
    let spam_review: serde_json::Value = app
        .post_json_auth(&uri, json!({ "rating": 1, "comment": "buy followers" }), &spam)
        .await
        .json();
    let spam_id = spam_review["id"].as_str().unwrap();

    let student_attempt = app
        .put_json_auth(
            &format!("/api/v1/admin/reviews/{}", spam_id),
            json!({ "is_approved": false }),
            &fair,
        )
        .await;
    student_attempt.assert_forbidden();

    let response = app
        .put_json_auth(
            &format!("/api/v1/admin/reviews/{}", spam_id),
            json!({ "is_approved": false }),
            &admin,
        )
        .await;
    response.assert_ok();
    let hidden: serde_json::Value = response.json();
    assert_eq!(hidden["is_approved"], false);

    let listing: serde_json::Value = app
        .get(&format!("/api/v1/rooms/{}/reviews", room.id))
        .await
        .json();
    assert_eq!(listing["total_reviews"], 1);
    assert_eq!(listing["average_rating"], 4.0);
    assert_eq!(listing["reviews"].as_array().unwrap().len(), 1);

    let moderation: serde_json::Value = app
        .get_auth("/api/v1/admin/reviews?approved=false", &admin)
        .await
        .json();
    assert_eq!(moderation.as_array().unwrap().len(), 1);
    assert_eq!(moderation[0]["id"], spam_id);

    let logs: serde_json::Value = app
        .get_auth("/api/v1/admin/activity-logs?resource_type=review", &admin)
        .await
        .json();
    assert_eq!(logs[0]["action"], "reject");

    app.put_json_auth(
        &format!("/api/v1/admin/reviews/{}", uuid::Uuid::new_v4()),
        json!({ "is_approved": true }),
        &admin,
    )
    .await
    .assert_not_found();
}

#[tokio::test]
async fn test_reports_are_filed_listed_and_resolved() {
    let app = TestApp::new().await;
    let room = app.create_room(RoomFixtures::lab()).await;
    let (reporter, token) = app.create_user(UserRole::Student).await;
    let (_, admin) = app.create_user(UserRole::Admin).await;
    let uri = format!("/api/v1/rooms/{}/reports", room.id);

    app.post_json_auth(&uri, json!({ "description": "  " }), &token)
        .await
        .assert_unprocessable();
    app.post_json(&uri, json!({ "description": "Door lock broken" }))
        .await
        .assert_unauthorized();

    let response = app
        .post_json_auth(&uri, json!({ "description": " Door lock broken " }), &token)
        .await;
    response.assert_created();
    let report: serde_json::Value = response.json();
    assert_eq!(report["description"], "Door lock broken");
    assert_eq!(report["room_name"], room.name);
    assert_eq!(report["user_id"], reporter.id.to_string());
    assert_eq!(report["is_resolved"], false);
    let report_id = report["id"].as_str().unwrap();

    app.get_auth("/api/v1/admin/reports", &token)
        .await
        .assert_forbidden();

    let open: serde_json::Value = app
        .get_auth("/api/v1/admin/reports?resolved=false", &admin)
        .await
        .json();
    assert_eq!(open.as_array().unwrap().len(), 1);
    assert_eq!(open[0]["reporter_name"], reporter.full_name);

    app.put_json_auth(
        &format!("/api/v1/admin/reports/{}", report_id),
        json!({ "is_resolved": true }),
        &admin,
    )
    .await
    .assert_ok();

    let open: serde_json::Value = app
        .get_auth("/api/v1/admin/reports?resolved=false", &admin)
        .await
        .json();
    assert!(open.as_array().unwrap().is_empty());
    let resolved: serde_json::Value = app
        .get_auth("/api/v1/admin/reports?resolved=true", &admin)
        .await
        .json();
    assert_eq!(resolved[0]["id"], report_id);
}
