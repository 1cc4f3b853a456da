//! SchedulerActor - Runs a collection round on every tick

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, warn};

use super::messages::{MonitorCommand, RoundSummary};

/// Whatever the scheduler triggers on each tick
#[async_trait]
pub trait RoundRunner: Send + Sync + 'static {
    async fn run_round(&self) -> RoundSummary;
}

/// Shortest period the scheduler ticks at
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// First tick one full period from now; ticks missed during a long round are skipped
fn new_ticker(period: Duration) -> Interval {
    let period = period.max(MIN_INTERVAL);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

pub struct SchedulerActor<R> {
    runner: Arc<R>,

    command_rx: mpsc::Receiver<MonitorCommand>,

    interval_duration: Duration,
}

impl<R: RoundRunner> SchedulerActor<R> {
    pub fn new(
        runner: Arc<R>,
        command_rx: mpsc::Receiver<MonitorCommand>,
        interval_duration: Duration,
    ) -> Self {
        Self {
            runner,
            command_rx,
            interval_duration,
        }
    }

    /// Run until a Shutdown command arrives or every handle is dropped
    #[instrument(skip(self), fields(interval = ?self.interval_duration))]
    pub async fn run(mut self) {
        debug!("starting scheduler actor");

        let mut ticker = new_ticker(self.interval_duration);

        loop {
            tokio::select! {
                // commands queued during a round win over a tick that became due meanwhile
                biased;

                command = self.command_rx.recv() => {
                    match command {
                        Some(MonitorCommand::CollectNow { respond_to }) => {
                            debug!("received CollectNow command");
                            let summary = self.runner.run_round().await;
                            let _ = respond_to.send(summary);
                        }

                        Some(MonitorCommand::UpdateInterval { interval_secs }) => {
                            debug!("updating interval to {interval_secs}s");
                            self.interval_duration =
                                Duration::from_secs(interval_secs).max(MIN_INTERVAL);
                            ticker = new_ticker(self.interval_duration);
                        }

                        Some(MonitorCommand::Shutdown) => {
                            debug!("received shutdown command");
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }

                _ = ticker.tick() => {
                    self.runner.run_round().await;
                }
            }
        }

        debug!("scheduler actor stopped");
    }
}

/// Handle for controlling a SchedulerActor
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<MonitorCommand>,
}

impl SchedulerHandle {
    /// Spawn the actor; the join handle resolves once it has stopped
    pub fn spawn<R: RoundRunner>(runner: Arc<R>, interval: Duration) -> (Self, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let actor = SchedulerActor::new(runner, cmd_rx, interval.max(MIN_INTERVAL));
        let task = tokio::spawn(actor.run());
        (Self { sender: cmd_tx }, task)
    }

    /// Run a round now and wait for its summary
    pub async fn collect_now(&self) -> Result<RoundSummary> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(MonitorCommand::CollectNow { respond_to: tx })
            .await
            .context("failed to send CollectNow command")?;

        rx.await.context("failed to receive round summary")
    }

    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(MonitorCommand::UpdateInterval { interval_secs })
            .await
            .context("failed to send UpdateInterval command")?;
        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(MonitorCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
