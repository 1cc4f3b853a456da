//! Threshold alerting over snapshots
//!
//! Rules are plain data loaded once from configuration. Evaluation is
//! stateless: every snapshot is checked on its own and each breach produces a
//! fresh [`Alert`]. Deduplication is left to the cache TTL of the alert key.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, instrument};

use crate::{ResourceId, SystemSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    Cpu,
    Memory,
    Disk,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricType::Cpu => "cpu",
            MetricType::Memory => "memory",
            MetricType::Disk => "disk",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "==")]
    Equal,
}

impl Comparison {
    pub fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::GreaterThan => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::LessThan => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::LessThan => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "==",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
}

/// One threshold rule; `resource: None` applies to every resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    #[serde(default)]
    pub resource: Option<ResourceId>,
    pub metric: MetricType,
    #[serde(default = "default_operator")]
    pub operator: Comparison,
    pub threshold: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub notify: Option<Webhook>,
}

fn default_operator() -> Comparison {
    Comparison::GreaterThan
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    pub fn new(metric: MetricType, operator: Comparison, threshold: f64) -> Self {
        Self {
            resource: None,
            metric,
            operator,
            threshold,
            enabled: true,
            notify: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource = Some(id);
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.notify = Some(Webhook { url: url.into() });
        self
    }

    pub fn applies_to(&self, id: ResourceId) -> bool {
        self.enabled && self.resource.is_none_or(|resource| resource == id)
    }
}

/// cpu > 80, memory > 85, disk > 90 for every resource
pub fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(MetricType::Cpu, Comparison::GreaterThan, 80.0),
        AlertRule::new(MetricType::Memory, Comparison::GreaterThan, 85.0),
        AlertRule::new(MetricType::Disk, Comparison::GreaterThan, 90.0),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Firing,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub server_id: ResourceId,
    pub metric_type: MetricType,
    pub current_value: f64,
    pub threshold: f64,
    pub status: AlertStatus,
    pub message: String,
    /// Capture time of the snapshot that breached the rule
    pub fired_at: DateTime<Utc>,
}

/// An alert together with where to announce it
#[derive(Debug, Clone, PartialEq)]
pub struct FiredAlert {
    pub alert: Alert,
    pub notify: Option<Webhook>,
}

#[derive(Debug, Clone)]
pub struct AlertEvaluator {
    rules: Vec<AlertRule>,
}

impl Default for AlertEvaluator {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl AlertEvaluator {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Alerts for every rule the snapshot breaches
    ///
    /// Disk rules are checked per partition, so one snapshot can fire the same
    /// disk rule several times, in partition order.
    pub fn evaluate(&self, snapshot: &SystemSnapshot) -> Vec<FiredAlert> {
        let mut fired = Vec::new();

        for rule in self.rules.iter().filter(|r| r.applies_to(snapshot.server_id)) {
            match rule.metric {
                MetricType::Cpu => {
                    let value = snapshot.cpu.usage;
                    if rule.operator.holds(value, rule.threshold) {
                        let message = format!(
                            "CPU usage {value:.2}% {} {:.2}%",
                            rule.operator, rule.threshold
                        );
                        fired.push(fire(rule, snapshot, value, message));
                    }
                }
                MetricType::Memory => {
                    let value = snapshot.memory.usage;
                    if rule.operator.holds(value, rule.threshold) {
                        let message = format!(
                            "Memory usage {value:.2}% {} {:.2}%",
                            rule.operator, rule.threshold
                        );
                        fired.push(fire(rule, snapshot, value, message));
                    }
                }
                MetricType::Disk => {
                    for partition in &snapshot.disk.partitions {
                        let value = partition.usage;
                        if rule.operator.holds(value, rule.threshold) {
                            let message = format!(
                                "Disk usage on {} {value:.2}% {} {:.2}%",
                                partition.mountpoint, rule.operator, rule.threshold
                            );
                            fired.push(fire(rule, snapshot, value, message));
                        }
                    }
                }
            }
        }

        if !fired.is_empty() {
            debug!(
                "resource {}: {} alert(s) firing",
                snapshot.server_id,
                fired.len()
            );
        }

        fired
    }
}

fn fire(rule: &AlertRule, snapshot: &SystemSnapshot, value: f64, message: String) -> FiredAlert {
    FiredAlert {
        alert: Alert {
            server_id: snapshot.server_id,
            metric_type: rule.metric,
            current_value: value,
            threshold: rule.threshold,
            status: AlertStatus::Firing,
            message,
            fired_at: snapshot.timestamp,
        },
        notify: rule.notify.clone(),
    }
}

/// Delivers alerts to webhooks
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    client: Client,
}

impl Default for AlertNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertNotifier {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                error!("failed to configure webhook client, using defaults: {e}");
                Client::new()
            });
        Self { client }
    }

    /// POST the alert as JSON; failures are logged and otherwise ignored
    #[instrument(skip(self, webhook, alert), fields(resource = %alert.server_id, metric = %alert.metric_type))]
    pub async fn notify(&self, webhook: &Webhook, alert: &Alert) {
        let payload = json!({
            "message": alert.message,
            "server_id": alert.server_id,
            "metric_type": alert.metric_type,
            "current_value": alert.current_value,
            "threshold": alert.threshold,
            "status": alert.status,
            "timestamp": alert.fired_at.to_rfc3339(),
        });

        match self.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}
