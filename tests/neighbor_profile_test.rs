mod common;

use axum::http::StatusCode;
use daylylog_server::models::{ContentKind, Domain, Post};
use daylylog_server::neighbor_profile::{aggregate_neighbor_content, bucket_posts};
use daylylog_server::{DomainError, database::content_category_id};
use serde_json::{Value, json};

async fn create_post(
    app: &common::TestApp,
    cookie: &str,
    kind: &str,
    domain: Domain,
    date: &str,
    is_public: bool,
    is_neighbor_visible: bool,
) -> Value {
    let (status, body) = common::post(
        app,
        &format!("/{}", kind),
        cookie,
        json!({
            "category_id": content_category_id(domain),
            "content": format!("{} entry on {}", domain.as_str(), date),
            "date": date,
            "is_public": is_public,
            "is_neighbor_visible": is_neighbor_visible,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

fn post(id: &str, category_name: Option<&str>) -> Post {
    Post {
        id: id.to_string(),
        kind: ContentKind::Reflection,
        author_id: "author".to_string(),
        category_id: "c".to_string(),
        category_name: category_name.map(str::to_string),
        title: None,
        content: "text".to_string(),
        date: "2026-10-01".to_string(),
        is_public: true,
        is_neighbor_visible: false,
        keywords: Vec::new(),
        answer: None,
        is_answered: None,
        created_at: "2026-10-01T00:00:00Z".to_string(),
    }
}

#[test]
fn unknown_categories_are_dropped_from_buckets() {
    let posts = vec![
        post("a", Some("Gratitude")),
        post("b", Some("growth ")),
        post("c", Some("hobbies")),
        post("d", None),
        post("e", Some("gratitude")),
    ];

    let (stats, buckets) = bucket_posts(posts);
    assert_eq!(stats.gratitude, 2);
    assert_eq!(stats.growth, 1);
    assert_eq!(stats.total(), 3);

    let bucketed: usize = buckets.values().map(Vec::len).sum();
    assert_eq!(bucketed as u32, stats.total());
    assert_eq!(buckets[&Domain::Gratitude][0].id, "a");
    assert!(buckets[&Domain::Daily].is_empty());
}

#[tokio::test]
async fn aggregator_requires_accepted_relationship() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (bob_id, bob) = common::user_with_session(&app, "bobby").await;

    let (status, body) = common::get(&app, &format!("/neighbors/{}/profile", bob_id), &alice).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Neighbor relationship not found");

    // Pending is not enough.
    common::post(&app, "/neighbors/request", &alice, json!({ "username": "bobby" })).await;
    let conn = app.state.main_db.read().await;
    let result = aggregate_neighbor_content(&conn, &alice_id, &bob_id, Domain::Gratitude).await;
    assert!(matches!(result, Err(DomainError::RelationshipNotFound)));
    drop(conn);

    // Unknown users answer the same way.
    let (status, _) = common::get(&app, "/neighbors/no-such-user/profile", &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn private_posts_never_reach_neighbors() {
    let app = common::setup_test_app().await.expect("setup");
    let (alice_id, alice) = common::user_with_session(&app, "alice").await;
    let (bob_id, bob) = common::user_with_session(&app, "bobby").await;
    common::make_neighbors(&app, &alice, "bobby", &bob, &alice_id).await;

    let shared = create_post(&app, &bob, "reflections", Domain::Gratitude, "2026-10-02", false, true).await;
    let public = create_post(&app, &bob, "questions", Domain::Gratitude, "2026-10-05", true, false).await;
    let private = create_post(&app, &bob, "reflections", Domain::Gratitude, "2026-10-09", false, false).await;
    create_post(&app, &bob, "reflections", Domain::Growth, "2026-10-03", false, true).await;

    let (status, detail) =
        common::get(&app, &format!("/neighbors/{}/profile", bob_id), &alice).await;
    assert_eq!(status, StatusCode::OK, "{}", detail);

    assert_eq!(detail["profile"]["username"], "bobby");
    assert_eq!(detail["active_domain"], "gratitude");
    assert_eq!(detail["domain_stats"]["gratitude"], 2);
    assert_eq!(detail["domain_stats"]["growth"], 1);
    assert_eq!(detail["total_posts"], 3);

    let current: Vec<&str> = detail["current_posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    // Newest first, across reflections and questions.
    assert_eq!(current, vec![public["id"].as_str().unwrap(), shared["id"].as_str().unwrap()]);
    assert!(!current.contains(&private["id"].as_str().unwrap()));

    let bucketed: usize = detail["posts_by_domain"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_array().unwrap().len())
        .sum();
    assert_eq!(bucketed, 3);

    let (_, growth) = common::get(
        &app,
        &format!("/neighbors/{}/profile?domain=growth", bob_id),
        &alice,
    )
    .await;
    assert_eq!(growth["active_domain"], "growth");
    assert_eq!(growth["current_posts"].as_array().unwrap().len(), 1);

    let (_, neighbors) = common::get(&app, "/neighbors", &alice).await;
    assert_eq!(neighbors[0]["visible_posts"], 3);
}
