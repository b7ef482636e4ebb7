use time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};
use tracing::info;
use tracing_subscriber::EnvFilter;

use daylylog_server::{AppState, config::Config, constants::*, database, routes::api_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    info!(
        host = %config.host,
        port = %config.port,
        data_path = %config.data_path,
        production = config.production,
        "configuration loaded"
    );

    let main_db = database::init_main_db(&config.data_path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize database: {}", e))?;

    let app_state = AppState { main_db };

    // Sessions live in memory and are lost on restart.
    let store = MemoryStore::default();

    let session_key = Key::try_from(config.session_secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid session secret: {}", e))?;

    let session_layer = SessionManagerLayer::new(store)
        .with_secure(config.production)
        .with_name(SESSION_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_signed(session_key);

    let frontend_origin_header = config
        .frontend_origin
        .parse::<axum::http::HeaderValue>()
        .map_err(|e| {
            anyhow::anyhow!(
                "Invalid FRONTEND_ORIGIN '{}': {}",
                config.frontend_origin,
                e
            )
        })?;

    let cors = CorsLayer::new()
        .allow_origin(frontend_origin_header)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::COOKIE,
        ])
        .allow_credentials(true);

    let app = api_router()
        .layer(cors)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", bind_address, e))?;

    info!("DaylyLog server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
