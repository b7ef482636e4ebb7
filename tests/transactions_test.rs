mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn ledger_direction_must_match_category_type() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let salary = common::category_id(&app, &cookie, "Salary").await;
    let food = common::category_id(&app, &cookie, "Food").await;

    let (status, _) = common::post(
        &app,
        "/incomes",
        &cookie,
        json!({ "category_id": food, "name": "Refund", "amount": 10.0, "date": "2026-10-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = common::post(
        &app,
        "/expenses",
        &cookie,
        json!({ "category_id": salary, "name": "Oops", "amount": 10.0, "date": "2026-10-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, income) = common::post(
        &app,
        "/incomes",
        &cookie,
        json!({ "category_id": salary, "name": "October pay", "amount": 3000.0, "date": "2026-10-01" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", income);

    // Moving an income into an expense category is rejected too.
    let (status, _) = common::put(
        &app,
        &format!("/incomes/{}", income["id"].as_str().unwrap()),
        &cookie,
        json!({ "category_id": food }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_amounts_and_dates_are_rejected() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let food = common::category_id(&app, &cookie, "Food").await;

    for payload in [
        json!({ "category_id": food, "name": "Lunch", "amount": -1.0, "date": "2026-10-01" }),
        json!({ "category_id": food, "name": "Lunch", "amount": 5.0, "date": "2026-13-01" }),
        json!({ "category_id": food, "name": "  ", "amount": 5.0, "date": "2026-10-01" }),
    ] {
        let (status, _) = common::post(&app, "/expenses", &cookie, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn listing_filters_and_totals() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, cookie) = common::user_with_session(&app, "alice").await;
    let food = common::category_id(&app, &cookie, "Food").await;
    let transport = common::category_id(&app, &cookie, "Transport").await;

    for (category, name, amount, date) in [
        (&food, "Lunch", 12.5, "2026-09-30"),
        (&food, "Dinner", 7.25, "2026-10-02"),
        (&transport, "Bus", 2.0, "2026-10-03"),
    ] {
        let (status, _) = common::post(
            &app,
            "/expenses",
            &cookie,
            json!({ "category_id": category, "name": name, "amount": amount, "date": date }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, all) = common::get(&app, "/expenses", &cookie).await;
    assert_eq!(all["total_count"], 3);
    assert_eq!(all["transactions"][0]["name"], "Bus");

    let (_, october) = common::get(
        &app,
        "/expenses?start_date=2026-10-01&end_date=2026-10-31",
        &cookie,
    )
    .await;
    assert_eq!(october["total_count"], 2);
    assert_eq!(october["total_amount"], 9.25);

    let (_, food_only) = common::get(&app, &format!("/expenses?category_id={}", food), &cookie).await;
    assert_eq!(food_only["total_count"], 2);
    assert_eq!(food_only["total_amount"], 19.75);

    let (_, paged) = common::get(&app, "/expenses?limit=1&offset=1", &cookie).await;
    assert_eq!(paged["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(paged["transactions"][0]["name"], "Dinner");
    assert_eq!(paged["total_count"], 3);
}

#[tokio::test]
async fn transactions_are_isolated_per_user() {
    let app = common::setup_test_app().await.expect("setup");
    let (_, alice) = common::user_with_session(&app, "alice").await;
    let (_, bob) = common::user_with_session(&app, "bobby").await;
    let food = common::category_id(&app, &alice, "Food").await;

    let (_, expense) = common::post(
        &app,
        "/expenses",
        &alice,
        json!({ "category_id": food, "name": "Lunch", "amount": 12.5, "date": "2026-10-01" }),
    )
    .await;
    let uri = format!("/expenses/{}", expense["id"].as_str().unwrap());

    let (_, bob_list) = common::get(&app, "/expenses", &bob).await;
    assert_eq!(bob_list["total_count"], 0);

    let (status, _) = common::put(&app, &uri, &bob, json!({ "amount": 1.0 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = common::delete(&app, &uri, &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = common::delete(&app, &uri, &alice).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn ledger_requires_login() {
    let app = common::setup_test_app().await.expect("setup");
    let (status, _) = common::json_request(&app, "GET", "/incomes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
