//! HTTP query surface.

pub mod error;
pub mod handlers;

use crate::service::StatisticsService;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub struct AppState {
    pub service: StatisticsService,
}

/// Build the application router.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/statistics/by-legislator",
            get(handlers::statistics_by_legislator),
        )
        .route(
            "/api/statistics/by-department",
            get(handlers::statistics_by_department),
        )
        .route(
            "/api/upload/by-legislator",
            post(handlers::upload_by_legislator),
        )
        .route(
            "/api/upload/by-department",
            post(handlers::upload_by_department),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router until the process is stopped.
pub async fn serve(state: Arc<AppState>, listen_addr: SocketAddr) -> anyhow::Result<()> {
    let router = app_router(state);
    info!("Listening on {}", listen_addr);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
