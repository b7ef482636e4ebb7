mod common;

use axum::http::StatusCode;
use daylylog_server::models::NeighborStatus;
use serde_json::json;

#[tokio::test]
async fn request_is_visible_from_both_sides() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (bob_id, bob) = common::user_with_session(&app, "bobby").await;

    let (status, body) =
        common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["requester_id"], alice_id.as_str());
    assert_eq!(body["recipient_id"], bob_id.as_str());

    let (_, alice_requests) = common::get(&app, "/neighbors/requests", &alice).await;
    assert_eq!(alice_requests["outgoing"].as_array().unwrap().len(), 1);
    assert!(alice_requests["incoming"].as_array().unwrap().is_empty());

    let (_, bob_requests) = common::get(&app, "/neighbors/requests", &bob).await;
    assert_eq!(bob_requests["incoming"].as_array().unwrap().len(), 1);
    assert!(bob_requests["outgoing"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn only_recipient_can_accept() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (bob_id, bob) = common::user_with_session(&app, "bobby").await;

    common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;

    let (status, _) =
        common::post(&app, "/neighbors/accept", &alice, json!({ "neighbor_id": bob_id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
        common::post(&app, "/neighbors/accept", &bob, json!({ "neighbor_id": alice_id })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "accepted");

    // Accepted is final for accept/decline.
    let (status, _) =
        common::post(&app, "/neighbors/decline", &bob, json!({ "neighbor_id": alice_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for cookie in [&alice, &bob] {
        let (status, list) = common::get(&app, "/neighbors", cookie).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }
    let (_, list) = common::get(&app, "/neighbors", &alice).await;
    assert_eq!(list[0]["profile"]["username"], "bobby");
}

#[tokio::test]
async fn duplicate_and_self_requests_are_rejected() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;

    let (status, _) =
        common::post(&app, "/neighbors/request", &alice, json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        common::post(&app, "/neighbors/request", &alice, json!({ "username": "nobody" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    let (status, _) =
        common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The reverse direction is the same pair.
    let (status, _) =
        common::post(&app, "/neighbors/request", &bob, json!({ "username": "alice" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn declined_pair_can_request_again() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;

    common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    let (status, body) =
        common::post(&app, "/neighbors/decline", &bob, json!({ "neighbor_id": alice_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "declined");

    let (status, body) =
        common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");

    let conn = app.state.main_db.read().await;
    let mut rows = conn
        .query("SELECT COUNT(*) FROM neighbor_relationships", ())
        .await
        .expect("count");
    let row = rows.next().await.expect("row").expect("some row");
    assert_eq!(row.get::<i64>(0).expect("count"), 1);
}

#[tokio::test]
async fn remove_deletes_relationship_for_both() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (bob_id, bob) = common::user_with_session(&app, "bobby").await;
    common::make_neighbors(&app, &alice, "bobby", &bob, &alice_id).await;

    let (status, _) = common::delete(&app, &format!("/neighbors/{}", alice_id), &bob).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = common::get(&app, "/neighbors", &alice).await;
    assert!(list.as_array().unwrap().is_empty());

    let (status, _) = common::delete(&app, &format!("/neighbors/{}", bob_id), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_excludes_self_and_requires_min_length() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    common::user_with_session(&app, "alicia").await;

    let (status, _) = common::get(&app, "/neighbors/search?query=al", &alice).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, users) = common::get(&app, "/neighbors/search?query=ali", &alice).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["username"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["alicia".to_string()]);
}

#[tokio::test]
async fn neighbor_routes_require_login() {
    let app = common::setup_test_app().await.expect("setup");
    let (status, body) = common::json_request(&app, "GET", "/neighbors", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, "Not logged in");
}

#[test]
fn only_pending_requests_can_be_answered() {
    use NeighborStatus::*;
    assert!(Pending.can_transition_to(Accepted));
    assert!(Pending.can_transition_to(Declined));
    for from in [Accepted, Declined] {
        for to in NeighborStatus::ALL {
            assert!(!from.can_transition_to(to), "{:?} -> {:?}", from, to);
        }
    }
    assert_eq!(NeighborStatus::parse("accepted"), Some(Accepted));
    assert_eq!(NeighborStatus::parse("blocked"), None);
}
