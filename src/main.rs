use std::time::Duration;

use axum::routing::get;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use listing_flow::{
    app_state::AppState,
    config::AppConfig,
    routes,
    services::{analyzer::FixtureAnalyzer, job_store::JobStore},
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing listing-flow reference backend");

    let prometheus_handle =
        routes::metrics::install_recorder().expect("Failed to install Prometheus metrics recorder");

    let step = Duration::from_millis(config.analyzer_step_ms);
    let analyzer = match &config.fixture_items_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading fixture items");
            FixtureAnalyzer::from_path(path, step).expect("Failed to load fixture items")
        }
        None => {
            tracing::warn!("FIXTURE_ITEMS_PATH not set, completed jobs will carry no items");
            FixtureAnalyzer::new(Vec::new(), step)
        }
    };

    let state = AppState::new(JobStore::new(), analyzer, config.max_upload_bytes);
    state.store.spawn_sweeper(config.job_retention());

    let app = routes::api_router(state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        // Multipart framing on top of the largest accepted video
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes + 64 * 1024));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(
        bind_addr = %config.bind_addr,
        max_upload_bytes = config.max_upload_bytes,
        "Server listening"
    );

    axum::serve(listener, app).await.expect("Server error");
}
