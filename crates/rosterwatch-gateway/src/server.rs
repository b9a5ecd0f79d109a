//! HTTP server implementation using Axum.

use axum::{
    Router,
    routing::{get, post},
};
use rosterwatch_core::config::GatewayConfig;
use rosterwatch_scheduler::Scheduler;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub start_time: std::time::Instant,
    /// Scheduler engine; owns the queue and the trigger jobs.
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(gateway_config: GatewayConfig, scheduler: Arc<Scheduler>) -> Self {
        Self {
            gateway_config,
            start_time: std::time::Instant::now(),
            scheduler,
        }
    }
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/scraper/status", get(super::routes::scraper_status))
        .route("/scraper/player/{id}", post(super::routes::scraper_update_player))
        .route("/scraper/refresh", post(super::routes::scraper_refresh))
        .route("/scraper/earnings", post(super::routes::scraper_earnings))
        .layer({
            let cors = CorsLayer::new()
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600));

            // Example: ROSTERWATCH_CORS_ORIGINS=https://admin.example.gg
            if let Ok(origins_str) = std::env::var("ROSTERWATCH_CORS_ORIGINS") {
                let origins: Vec<_> = origins_str
                    .split(',')
                    .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
                    .collect();
                cors.allow_origin(origins)
            } else {
                cors.allow_origin(Any)
            }
        })
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server and serve until `shutdown` resolves.
pub async fn start(
    config: &GatewayConfig,
    scheduler: Arc<Scheduler>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(AppState::new(config.clone(), scheduler));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
