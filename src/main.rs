//! Travel agent HTTP server

use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use travel_agent::api::{create_router, AppState};
use travel_agent::app::build_session;
use travel_agent::config::{load_dotenv, ServerConfig, SessionConfig};
use travel_agent::llm::LlmConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Environment is settled before any runtime thread exists
    let dotenv = load_dotenv();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(serve(dotenv))
}

async fn serve(dotenv: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "travel_agent=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false),
        )
        .init();

    if let Some(path) = dotenv {
        tracing::info!(path = %path.display(), "Loaded .env");
    }

    // Configuration
    let server_config = ServerConfig::from_env();
    let session_config = SessionConfig::from_env();
    tracing::info!(
        turn_timeout_secs = session_config.turn_timeout.as_secs(),
        max_steps = session_config.max_steps,
        "Session limits"
    );

    let session = build_session(&LlmConfig::from_env(), session_config);
    let state = AppState::new(Arc::new(session));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let listener =
        tokio::net::TcpListener::bind((server_config.host.as_str(), server_config.port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "Travel agent server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
