mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

async fn create_fund(app: &common::TestApp, cookie: &str) -> Value {
    let (status, goal) = common::post(
        app,
        "/goals",
        cookie,
        json!({
            "title": "Emergency fund",
            "type": "save_money",
            "target_amount": 1000.0,
            "current_amount": 250.0,
            "challenge_mode": "amount",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", goal);
    goal
}

#[tokio::test]
async fn targets_must_match_challenge_mode() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;

    let (status, _) = common::post(
        &app,
        "/goals",
        &cookie,
        json!({ "title": "Both", "type": "custom", "target_amount": 10.0, "challenge_mode": "both" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(
        &app,
        "/goals",
        &cookie,
        json!({ "title": "Count", "type": "custom", "target_count": 0, "challenge_mode": "count" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, goal) = common::post(
        &app,
        "/goals",
        &cookie,
        json!({ "title": "Runs", "type": "custom", "target_count": 12, "challenge_mode": "count" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(goal["status"], "active");
    assert_eq!(goal["current_count"], 0);
}

#[tokio::test]
async fn status_transitions_follow_lifecycle() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let goal = create_fund(&app, &cookie).await;
    let uri = format!("/goals/{}/status", goal["id"].as_str().unwrap());

    for (next, expected) in [
        ("paused", StatusCode::OK),
        ("completed", StatusCode::BAD_REQUEST),
        ("active", StatusCode::OK),
        ("completed", StatusCode::OK),
        ("active", StatusCode::BAD_REQUEST),
        ("cancelled", StatusCode::BAD_REQUEST),
    ] {
        let (status, body) = common::put(&app, &uri, &cookie, json!({ "status": next })).await;
        assert_eq!(status, expected, "-> {}: {}", next, body);
    }

    let (_, completed) = common::get(&app, "/goals?status=completed", &cookie).await;
    assert_eq!(completed["total_count"], 1);
    let (_, active) = common::get(&app, "/goals?status=active", &cookie).await;
    assert_eq!(active["total_count"], 0);
}

#[tokio::test]
async fn manual_progress_and_rendering() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let goal = create_fund(&app, &cookie).await;
    let id = goal["id"].as_str().unwrap();

    let (_, progress) = common::get(&app, &format!("/goals/{}/progress", id), &cookie).await;
    assert_eq!(progress["goal_id"], id);
    assert_eq!(progress["amount"]["progress"], 25);
    assert!(progress["count"].is_null());

    let (status, updated) = common::put(
        &app,
        &format!("/goals/{}", id),
        &cookie,
        json!({ "current_amount": 1250.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["title"], "Emergency fund");

    let (_, progress) = common::get(&app, &format!("/goals/{}/progress", id), &cookie).await;
    assert_eq!(progress["amount"]["progress"], 125);
    assert_eq!(progress["amount"]["bar_width"], 100);

    let (status, _) = common::put(
        &app,
        &format!("/goals/{}", id),
        &cookie,
        json!({ "current_amount": -5.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn goals_are_owner_scoped() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;
    let goal = create_fund(&app, &alice).await;
    let uri = format!("/goals/{}", goal["id"].as_str().unwrap());

    let (status, _) = common::get(&app, &uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::delete(&app, &uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::delete(&app, &uri, &alice).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = common::get(&app, &uri, &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
