//! Message types for the scheduler actor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Outcome of one collection round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    /// Resources registered when the round started
    pub resources: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Commands that can be sent to a SchedulerActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Run a round right away, outside the interval timer
    CollectNow {
        respond_to: oneshot::Sender<RoundSummary>,
    },

    /// Change the tick interval; the next tick is one full new interval away
    UpdateInterval { interval_secs: u64 },

    /// Stop after the in-flight round, if any, has finished
    Shutdown,
}
