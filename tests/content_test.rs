mod common;

use axum::http::StatusCode;
use daylylog_server::content::validate_keywords;
use serde_json::{Value, json};

async fn create_reflection(app: &common::TestApp, cookie: &str, payload: Value) -> Value {
    let (status, body) = common::post(app, "/reflections", cookie, payload).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

#[tokio::test]
async fn reflection_crud_round() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;

    let created = create_reflection(
        &app,
        &cookie,
        json!({
            "category_id": "content-daily",
            "title": "Morning",
            "content": "Walked to work",
            "date": "2026-10-10",
            "keywords": ["walk", " walk ", "", "morning"],
        }),
    )
    .await;
    assert_eq!(created["category_name"], "daily");
    assert_eq!(created["keywords"], json!(["walk", "morning"]));
    assert_eq!(created["is_public"], false);
    assert!(created.get("is_answered").is_none());

    let uri = format!("/reflections/{}", created["id"].as_str().unwrap());
    let (status, updated) = common::put(
        &app,
        &uri,
        &cookie,
        json!({ "content": "Cycled to work", "is_public": true }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["content"], "Cycled to work");
    assert_eq!(updated["title"], "Morning");
    assert_eq!(updated["is_public"], true);

    let (_, list) = common::get(&app, "/reflections?start_date=2026-10-01&end_date=2026-10-31", &cookie).await;
    assert_eq!(list["total_count"], 1);

    let (status, _) = common::delete(&app, &uri, &cookie).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = common::get(&app, &uri, &cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_content_category_is_rejected() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;

    let (status, _) = common::post(
        &app,
        "/reflections",
        &cookie,
        json!({ "category_id": "content-nope", "content": "x", "date": "2026-10-10" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn visibility_rules_apply_to_single_reads() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;
    let (_, carol) = common::user_with_session(&app, "carol").await;
    common::make_neighbors(&app, &alice, "bobby", &bob, &alice_id).await;

    let private = create_reflection(
        &app,
        &alice,
        json!({ "category_id": "content-gratitude", "content": "mine", "date": "2026-10-01" }),
    )
    .await;
    let neighbors_only = create_reflection(
        &app,
        &alice,
        json!({
            "category_id": "content-gratitude",
            "content": "for neighbors",
            "date": "2026-10-02",
            "is_neighbor_visible": true,
        }),
    )
    .await;
    let public = create_reflection(
        &app,
        &alice,
        json!({
            "category_id": "content-gratitude",
            "content": "for everyone",
            "date": "2026-10-03",
            "is_public": true,
        }),
    )
    .await;

    let read = |post: &Value| format!("/reflections/{}", post["id"].as_str().unwrap());

    let expectations = [
        (&bob, &private, StatusCode::NOT_FOUND),
        (&bob, &neighbors_only, StatusCode::OK),
        (&bob, &public, StatusCode::OK),
        (&carol, &private, StatusCode::NOT_FOUND),
        (&carol, &neighbors_only, StatusCode::NOT_FOUND),
        (&carol, &public, StatusCode::OK),
        (&alice, &private, StatusCode::OK),
    ];
    for (cookie, post, expected) in expectations {
        let (status, _) = common::get(&app, &read(post), cookie).await;
        assert_eq!(status, expected, "{}", post["content"]);
    }

    // Only the owner can edit.
    let (status, _) = common::put(&app, &read(&public), &bob, json!({ "content": "hijack" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn answering_a_question() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;

    let (status, question) = common::post(
        &app,
        "/questions",
        &cookie,
        json!({
            "category_id": "content-reflection",
            "content": "What went well today?",
            "date": "2026-10-12",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(question["is_answered"], false);

    let uri = format!("/questions/{}/answer", question["id"].as_str().unwrap());
    let (status, answered) = common::put(&app, &uri, &cookie, json!({ "answer": "The talk" })).await;
    assert_eq!(status, StatusCode::OK, "{}", answered);
    assert_eq!(answered["answer"], "The talk");
    assert_eq!(answered["is_answered"], true);

    let (_, cleared) = common::put(&app, &uri, &cookie, json!({ "answer": "  " })).await;
    assert_eq!(cleared["is_answered"], false);
    assert!(cleared.get("answer").is_none());
}

#[test]
fn keyword_limits() {
    let too_many: Vec<String> = (0..21).map(|i| format!("k{}", i)).collect();
    assert!(validate_keywords(too_many).is_err());
    assert!(validate_keywords(vec!["x".repeat(51)]).is_err());
    assert_eq!(
        validate_keywords(vec!["a".into(), "a".into(), "b".into()]).unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}
