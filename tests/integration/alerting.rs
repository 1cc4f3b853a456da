//! Threshold alert tests
//!
//! These tests verify that:
//! - Thresholds are strict (a value equal to the threshold does not fire)
//! - Fired alerts are recorded in the cache per resource and metric
//! - Rules with a webhook POST the alert to it
//! - A failing webhook never fails the round

use fleet_monitor::ResourceId;
use fleet_monitor::alerts::{Alert, AlertRule, AlertStatus, Comparison, MetricType};
use fleet_monitor::cache::CacheStore;
use fleet_monitor::config::MonitorConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

fn alert_key(id: u64, metric: &str) -> String {
    format!("{NAMESPACE}:alert:{id}:{metric}")
}

#[tokio::test]
async fn test_cpu_at_threshold_does_not_fire() {
    let fleet = FakeFleet::with_cpu(80.0);
    let (store, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(1)).await.unwrap();

    service.collect_round().await;

    assert!(!store.exists(&alert_key(1, "cpu")).await.unwrap());
}

#[tokio::test]
async fn test_cpu_above_threshold_fires() {
    let fleet = FakeFleet::with_cpu(81.0);
    let (store, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(1)).await.unwrap();

    service.collect_round().await;

    let raw = store.get(&alert_key(1, "cpu")).await.unwrap().unwrap();
    let alert: Alert = serde_json::from_str(&raw).unwrap();
    assert_eq!(alert.server_id, ResourceId(1));
    assert_eq!(alert.metric_type, MetricType::Cpu);
    assert_eq!(alert.current_value, 81.0);
    assert_eq!(alert.threshold, 80.0);
    assert_eq!(alert.status, AlertStatus::Firing);

    assert!(!store.exists(&alert_key(1, "memory")).await.unwrap());
    assert!(!store.exists(&alert_key(1, "disk")).await.unwrap());
}

#[tokio::test]
async fn test_memory_and_disk_defaults() {
    let fleet = FakeFleet {
        memory: 86.0,
        disk: 90.0,
        ..FakeFleet::with_cpu(10.0)
    };
    let (store, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(2)).await.unwrap();

    service.collect_round().await;

    assert!(store.exists(&alert_key(2, "memory")).await.unwrap());
    assert!(!store.exists(&alert_key(2, "disk")).await.unwrap());
}

#[tokio::test]
async fn test_scoped_rule_only_applies_to_its_resource() {
    let fleet = FakeFleet::with_cpu(50.0);
    let config = MonitorConfig {
        alerts: Some(vec![
            AlertRule::new(MetricType::Cpu, Comparison::GreaterThan, 40.0)
                .for_resource(ResourceId(2)),
        ]),
        ..MonitorConfig::default()
    };
    let (store, service) = create_test_service(&fleet, config, &[]);
    add_resources(&service, &[1, 2]).await;

    service.collect_round().await;

    assert!(!store.exists(&alert_key(1, "cpu")).await.unwrap());
    assert!(store.exists(&alert_key(2, "cpu")).await.unwrap());
}

#[tokio::test]
async fn test_webhook_receives_alert() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .and(body_partial_json(json!({
            "server_id": 3,
            "metric_type": "cpu",
            "current_value": 95.0,
            "threshold": 90.0,
            "status": "firing",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fleet = FakeFleet::with_cpu(95.0);
    let config = MonitorConfig {
        alerts: Some(vec![
            AlertRule::new(MetricType::Cpu, Comparison::GreaterThan, 90.0)
                .with_webhook(format!("{}/hooks/alerts", mock_server.uri())),
        ]),
        ..MonitorConfig::default()
    };
    let (_, service) = create_test_service(&fleet, config, &[]);
    service.add_resource(ResourceId(3)).await.unwrap();

    let summary = service.collect_round().await;
    assert_eq!(summary.succeeded, 1);

    // expectation checked when the mock server drops
}

#[tokio::test]
async fn test_failing_webhook_does_not_fail_round() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fleet = FakeFleet::with_cpu(95.0);
    let config = MonitorConfig {
        alerts: Some(vec![
            AlertRule::new(MetricType::Cpu, Comparison::GreaterThan, 90.0)
                .with_webhook(format!("{}/hook", mock_server.uri())),
        ]),
        ..MonitorConfig::default()
    };
    let (store, service) = create_test_service(&fleet, config, &[]);
    service.add_resource(ResourceId(3)).await.unwrap();

    let summary = service.collect_round().await;

    assert_eq!(summary.succeeded, 1);
    assert!(store.exists(&alert_key(3, "cpu")).await.unwrap());
}
