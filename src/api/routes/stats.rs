//! System statistics endpoint

use axum::{Json, extract::State};

use crate::api::state::ApiState;
use crate::monitors::liveness::SystemStats;

/// GET /api/v1/stats
///
/// Online/offline counts across all monitored servers
pub async fn get_stats(State(state): State<ApiState>) -> Json<SystemStats> {
    Json(state.service.get_system_stats().await)
}
