//! Server endpoints

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use futures::future::join_all;

use crate::api::{
    error::ApiResult,
    state::ApiState,
    types::{AddServerRequest, ProcessQuery, ServerInfo, ServersResponse, StatusResponse},
};
use crate::{ProcessSnapshot, ResourceId, ServiceRunState, SystemSnapshot};

const DEFAULT_PROCESS_LIMIT: usize = 50;
const MAX_PROCESS_LIMIT: usize = 1000;

fn parse_id(raw: &str) -> ApiResult<ResourceId> {
    Ok(raw.parse::<ResourceId>()?)
}

/// GET /api/v1/servers
pub async fn list_servers(State(state): State<ApiState>) -> Json<ServersResponse> {
    let ids = state.service.monitored_resources().await;
    let statuses = join_all(ids.iter().map(|id| state.service.get_server_status(*id))).await;

    let servers: Vec<ServerInfo> = ids
        .into_iter()
        .zip(statuses)
        .map(|(server_id, status)| ServerInfo { server_id, status })
        .collect();

    Json(ServersResponse {
        count: servers.len(),
        servers,
    })
}

/// POST /api/v1/servers
///
/// Body `{"server_id": n}`; anything but a positive integer is a 400
pub async fn add_server(
    State(state): State<ApiState>,
    payload: Result<Json<AddServerRequest>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(request) = payload?;
    let id = ResourceId::new(request.server_id);
    state.service.add_resource(id).await?;
    let status = state.service.get_server_status(id).await;

    Ok(Json(StatusResponse {
        server_id: id,
        status,
    }))
}

/// DELETE /api/v1/servers/:id
pub async fn remove_server(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&server_id)?;
    state.service.remove_resource(id).await?;
    Ok(StatusCode::OK)
}

/// GET /api/v1/servers/:id/metrics
///
/// Latest snapshot, 404 when there is no fresh data
pub async fn get_server_metrics(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<Json<SystemSnapshot>> {
    let id = parse_id(&server_id)?;
    Ok(Json(state.service.get_server_metrics(id).await?))
}

/// GET /api/v1/servers/:id/status
pub async fn get_server_status(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let id = parse_id(&server_id)?;
    let status = state.service.get_server_status(id).await;
    Ok(Json(StatusResponse {
        server_id: id,
        status,
    }))
}

/// GET /api/v1/servers/:id/history
pub async fn get_server_history(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
) -> ApiResult<Json<Vec<SystemSnapshot>>> {
    let id = parse_id(&server_id)?;
    Ok(Json(state.service.get_server_history(id).await?))
}

/// GET /api/v1/servers/:id/processes?limit=
pub async fn get_processes(
    State(state): State<ApiState>,
    Path(server_id): Path<String>,
    Query(query): Query<ProcessQuery>,
) -> ApiResult<Json<Vec<ProcessSnapshot>>> {
    let id = parse_id(&server_id)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PROCESS_LIMIT)
        .min(MAX_PROCESS_LIMIT);
    Ok(Json(state.service.get_process_metrics(id, limit).await?))
}

/// GET /api/v1/servers/:id/services/:name
pub async fn get_service_status(
    State(state): State<ApiState>,
    Path((server_id, name)): Path<(String, String)>,
) -> ApiResult<Json<ServiceRunState>> {
    let id = parse_id(&server_id)?;
    Ok(Json(state.service.check_service_status(id, &name).await?))
}
