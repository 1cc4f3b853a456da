//! REST API over the monitoring service
//!
//! Thin read/write surface mapping [`MonitorService`](crate::service::MonitorService)
//! results onto HTTP status codes.
//!
//! ## Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/stats` - Online/offline counts
//! - `GET /api/v1/servers` - List monitored servers
//! - `POST /api/v1/servers` - Start monitoring a server
//! - `DELETE /api/v1/servers/:id` - Stop monitoring a server
//! - `GET /api/v1/servers/:id/metrics` - Latest snapshot
//! - `GET /api/v1/servers/:id/status` - Online/offline
//! - `GET /api/v1/servers/:id/history` - Not implemented (501)
//! - `GET /api/v1/servers/:id/processes?limit=` - Process listing
//! - `GET /api/v1/servers/:id/services/:name` - OS service run state

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{delete, get},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;

/// All routes, without the optional CORS layer
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/stats", get(routes::stats::get_stats))
        .route(
            "/api/v1/servers",
            get(routes::servers::list_servers).post(routes::servers::add_server),
        )
        .route("/api/v1/servers/:id", delete(routes::servers::remove_server))
        .route(
            "/api/v1/servers/:id/metrics",
            get(routes::servers::get_server_metrics),
        )
        .route(
            "/api/v1/servers/:id/status",
            get(routes::servers::get_server_status),
        )
        .route(
            "/api/v1/servers/:id/history",
            get(routes::servers::get_server_history),
        )
        .route(
            "/api/v1/servers/:id/processes",
            get(routes::servers::get_processes),
        )
        .route(
            "/api/v1/servers/:id/services/:name",
            get(routes::servers::get_service_status),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: &ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind);

    let mut app = router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
