#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use daylylog_server::{AppState, auth, constants::*, database, routes::api_router};
use serde_json::Value;
use time::Duration;
use tower::util::ServiceExt;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};

#[derive(Clone)]
pub struct TestConfig {
    pub temp_dir_path: String,
}

impl TestConfig {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        let temp_dir_path = temp_dir.path().to_string_lossy().to_string();
        std::mem::forget(temp_dir);
        Ok(Self { temp_dir_path })
    }

    pub fn data_path(&self) -> String {
        self.temp_dir_path.clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub async fn setup_test_app() -> anyhow::Result<TestApp> {
    let test_config = TestConfig::new()?;
    let data_path = test_config.data_path();

    let main_db = database::init_main_db(&data_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize main database: {}", e))?;

    let app_state = AppState { main_db };

    let session_secret = "test_secret_key_at_least_64_chars_long_test_secret_key_at_least_64_";
    let session_key = Key::try_from(session_secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))?;

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_name(SESSION_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_signed(session_key);

    let router = api_router()
        .layer(session_layer)
        .with_state(app_state.clone());

    Ok(TestApp {
        router,
        state: app_state,
    })
}

/// Registers a user through the same path as `/auth/register`, returning its id.
pub async fn create_test_user(
    app_state: &AppState,
    username: &str,
    password: &str,
) -> anyhow::Result<String> {
    let user = auth::create_user(&app_state.main_db, username, password)
        .await
        .map_err(|(status, msg)| anyhow::anyhow!("Failed to create test user: {} {}", status, msg))?;
    Ok(user.id)
}

pub async fn login_user(app: &Router, username: &str, password: &str) -> anyhow::Result<String> {
    let payload = serde_json::json!({
        "username": username,
        "password": password
    });

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .map_err(|e| anyhow::anyhow!("Failed to build request: {}", e))?;

    let response = app
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to execute request: {}", e))?;

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
        .ok_or_else(|| anyhow::anyhow!("No session cookie in response"))?;

    // Only the `name=value` pair goes back in the Cookie header.
    let pair = set_cookie.split(';').next().unwrap_or(set_cookie);
    Ok(pair.to_string())
}

/// Creates a user and logs them in, returning `(user_id, cookie)`.
pub async fn user_with_session(app: &TestApp, username: &str) -> (String, String) {
    let user_id = create_test_user(&app.state, username, "password123")
        .await
        .expect("create user");
    let cookie = login_user(&app.router, username, "password123")
        .await
        .expect("login");
    (user_id, cookie)
}

pub async fn json_request(
    app: &TestApp,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    payload: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    let body = match payload {
        Some(payload) => Body::from(payload.to_string()),
        None => Body::empty(),
    };
    let request = builder.body(body).expect("build request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("execute request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| {
        Value::String(String::from_utf8(bytes.to_vec()).expect("utf8"))
    });
    (status, body)
}

pub async fn get(app: &TestApp, uri: &str, cookie: &str) -> (StatusCode, Value) {
    json_request(app, "GET", uri, Some(cookie), None).await
}

pub async fn post(app: &TestApp, uri: &str, cookie: &str, payload: Value) -> (StatusCode, Value) {
    json_request(app, "POST", uri, Some(cookie), Some(payload)).await
}

pub async fn put(app: &TestApp, uri: &str, cookie: &str, payload: Value) -> (StatusCode, Value) {
    json_request(app, "PUT", uri, Some(cookie), Some(payload)).await
}

pub async fn delete(app: &TestApp, uri: &str, cookie: &str) -> (StatusCode, Value) {
    json_request(app, "DELETE", uri, Some(cookie), None).await
}

/// Id of the user's seeded category with this name.
pub async fn category_id(app: &TestApp, cookie: &str, name: &str) -> String {
    let (status, body) = get(app, "/categories", cookie).await;
    assert_eq!(status, StatusCode::OK);
    body["categories"]
        .as_array()
        .expect("categories array")
        .iter()
        .find(|c| c["name"] == name)
        .and_then(|c| c["id"].as_str())
        .unwrap_or_else(|| panic!("category {} not found", name))
        .to_string()
}

/// Today's date as `YYYY-MM-DD`, matching what the server treats as the current month.
pub fn today() -> String {
    daylylog_server::utils::format_date(daylylog_server::utils::today())
}

/// Makes `a` and `b` accepted neighbors (`a` asks, `b` accepts).
pub async fn make_neighbors(app: &TestApp, a_cookie: &str, b_username: &str, b_cookie: &str, a_id: &str) {
    let (status, _) = post(
        app,
        "/neighbors/request",
        a_cookie,
        serde_json::json!({ "username": b_username }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post(
        app,
        "/neighbors/accept",
        b_cookie,
        serde_json::json!({ "neighbor_id": a_id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
