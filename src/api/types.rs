//! Request and response bodies of the REST API

use serde::{Deserialize, Serialize};

use crate::ResourceId;
use crate::monitors::liveness::ServerStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Whether the collection loop is running
    pub monitoring: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_id: ResourceId,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersResponse {
    pub servers: Vec<ServerInfo>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddServerRequest {
    pub server_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub server_id: ResourceId,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessQuery {
    /// Max processes (default: 50)
    pub limit: Option<usize>,
}
