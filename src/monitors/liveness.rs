//! Staleness-based liveness
//!
//! A resource is online while its latest snapshot is fresh. Nothing is pushed
//! or tracked between rounds; the status is derived each time it is read.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Age past which a snapshot no longer proves the resource is alive
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
}

impl ServerStatus {
    /// `Offline` when there is no snapshot or it is older than `staleness`
    ///
    /// A snapshot exactly `staleness` old is still online.
    pub fn evaluate(
        snapshot_time: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        staleness: Duration,
    ) -> ServerStatus {
        let Some(timestamp) = snapshot_time else {
            return ServerStatus::Offline;
        };

        let limit = TimeDelta::from_std(staleness).unwrap_or(TimeDelta::MAX);
        if now.signed_duration_since(timestamp) > limit {
            return ServerStatus::Offline;
        }

        ServerStatus::Online
    }

    pub fn is_online(self) -> bool {
        self == ServerStatus::Online
    }
}

/// Online/offline counts across the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub computed_at: DateTime<Utc>,
}

impl SystemStats {
    pub fn from_statuses(
        statuses: impl IntoIterator<Item = ServerStatus>,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let (mut online, mut offline) = (0, 0);
        for status in statuses {
            match status {
                ServerStatus::Online => online += 1,
                ServerStatus::Offline => offline += 1,
            }
        }

        Self {
            total: online + offline,
            online,
            offline,
            computed_at,
        }
    }
}
