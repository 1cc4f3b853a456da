//! API shared state

use crate::service::MonitorService;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: MonitorService,
}

impl ApiState {
    pub fn new(service: MonitorService) -> Self {
        Self { service }
    }
}
