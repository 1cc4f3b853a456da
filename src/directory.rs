//! System of record for which resources exist
//!
//! Consulted once when monitoring starts, to seed the registry.

use async_trait::async_trait;

use crate::ResourceId;

#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn list_active_resources(&self) -> anyhow::Result<Vec<ResourceId>>;
}

/// Directory backed by a fixed list, typically from the configuration file
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    resources: Vec<ResourceId>,
}

impl StaticDirectory {
    pub fn new(resources: Vec<ResourceId>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl ResourceDirectory for StaticDirectory {
    async fn list_active_resources(&self) -> anyhow::Result<Vec<ResourceId>> {
        Ok(self.resources.clone())
    }
}
