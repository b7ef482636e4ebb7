mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn registration_seeds_default_categories() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;

    let (status, body) = common::get(&app, "/categories", &cookie).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 7);
    assert!(
        body["categories"]
            .as_array()
            .unwrap()
            .iter()
            .all(|c| c["is_default"] == true)
    );

    let (_, incomes) = common::get(&app, "/categories?type=income_fixed", &cookie).await;
    assert_eq!(incomes["total_count"], 1);
    assert_eq!(incomes["categories"][0]["name"], "Salary");

    let (_, searched) = common::get(&app, "/categories?search=TRANS", &cookie).await;
    assert_eq!(searched["categories"][0]["name"], "Transport");
}

#[tokio::test]
async fn names_are_unique_per_owner_case_insensitive() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;

    let payload = json!({ "name": "Pets", "type": "expense_variable" });
    let (status, created) = common::post(&app, "/categories", &alice, payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["color"], "#9CA3AF");
    assert_eq!(created["is_default"], false);

    let (status, _) = common::post(
        &app,
        "/categories",
        &alice,
        json!({ "name": "pets", "type": "expense_fixed" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Another owner may reuse the name.
    let (status, _) = common::post(&app, "/categories", &bob, payload).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn category_type_is_immutable() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let food = common::category_id(&app, &cookie, "Food").await;

    let (status, updated) = common::put(
        &app,
        &format!("/categories/{}", food),
        &cookie,
        json!({ "name": "Groceries", "type": "income_fixed" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["name"], "Groceries");
    assert_eq!(updated["type"], "expense_variable");

    let (status, _) = common::put(
        &app,
        &format!("/categories/{}", food),
        &cookie,
        json!({ "name": "housing" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn category_in_use_cannot_be_deleted() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let food = common::category_id(&app, &cookie, "Food").await;
    let shopping = common::category_id(&app, &cookie, "Shopping").await;

    let (status, _) = common::post(
        &app,
        "/expenses",
        &cookie,
        json!({ "category_id": food, "name": "Lunch", "amount": 12.5, "date": "2026-10-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::delete(&app, &format!("/categories/{}", food), &cookie).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Unused defaults can go; goals linked to them lose the link.
    let (_, goal) = common::post(
        &app,
        "/goals",
        &cookie,
        json!({
            "category_id": shopping,
            "title": "Fewer gadgets",
            "type": "reduce_expense",
            "target_count": 2,
            "challenge_mode": "count",
        }),
    )
    .await;
    let (status, _) = common::delete(&app, &format!("/categories/{}", shopping), &cookie).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, goal) = common::get(&app, &format!("/goals/{}", goal["id"].as_str().unwrap()), &cookie).await;
    assert!(goal["category_id"].is_null());
}

#[tokio::test]
async fn categories_are_scoped_to_owner() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;
    let alice_food = common::category_id(&app, &alice, "Food").await;

    let (status, _) = common::put(
        &app,
        &format!("/categories/{}", alice_food),
        &bob,
        json!({ "name": "Mine now" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::post(
        &app,
        "/expenses",
        &bob,
        json!({ "category_id": alice_food, "name": "Lunch", "amount": 5.0, "date": "2026-10-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_delete_leaves_category_and_goals_untouched() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let food = common::category_id(&app, &cookie, "Food").await;

    common::post(
        &app,
        "/expenses",
        &cookie,
        json!({ "category_id": food, "name": "Lunch", "amount": 12.5, "date": common::today() }),
    )
    .await;
    let (_, goal) = common::post(
        &app,
        "/goals",
        &cookie,
        json!({
            "category_id": food,
            "title": "Cook at home",
            "type": "reduce_expense",
            "target_amount": 300.0,
            "challenge_mode": "amount",
        }),
    )
    .await;

    let (status, _) = common::delete(&app, &format!("/categories/{}", food), &cookie).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let conn = app.state.main_db.read().await;
    assert!(conn.is_autocommit());
    drop(conn);

    let (_, goal) =
        common::get(&app, &format!("/goals/{}", goal["id"].as_str().unwrap()), &cookie).await;
    assert_eq!(goal["category_id"], food.as_str());
    assert_eq!(common::category_id(&app, &cookie, "Food").await, food);

    let (status, _) = common::delete(&app, "/categories/no-such-category", &cookie).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
