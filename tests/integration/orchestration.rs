//! Registry and scheduling tests
//!
//! These tests verify that:
//! - Resources from the directory are registered when monitoring starts
//! - Adding and removing resources is idempotent
//! - The loop collects on every tick and follows interval changes
//! - A round never runs more collections at once than configured

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use fleet_monitor::ResourceId;
use fleet_monitor::config::MonitorConfig;
use fleet_monitor::error::MonitorError;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_start_registers_directory_resources() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[3, 1, 2]);

    service
        .start_monitoring(Duration::from_secs(3600))
        .await
        .unwrap();

    assert!(service.is_monitoring().await);
    assert_eq!(service.monitored_resources().await, ids(&[1, 2, 3]));

    service.stop_monitoring().await.unwrap();
    assert!(!service.is_monitoring().await);
}

#[tokio::test]
async fn test_add_resource_twice_keeps_one_entry() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);

    service.add_resource(ResourceId(7)).await.unwrap();
    service.add_resource(ResourceId(7)).await.unwrap();
    assert_eq!(service.monitored_resources().await, ids(&[7]));

    let summary = service.collect_round().await;
    assert_eq!(summary.resources, 1);
    assert_eq!(fleet.calls(), 1);
}

#[tokio::test]
async fn test_remove_unknown_resource_is_ok() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);

    service.remove_resource(ResourceId(99)).await.unwrap();
    assert!(service.monitored_resources().await.is_empty());
}

#[tokio::test]
async fn test_lifecycle_errors() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[1]);

    assert_matches!(
        service.stop_monitoring().await,
        Err(MonitorError::NotRunning)
    );
    assert_matches!(
        service.update_interval(10).await,
        Err(MonitorError::NotRunning)
    );

    service
        .start_monitoring(Duration::from_secs(3600))
        .await
        .unwrap();
    assert_matches!(
        service.start_monitoring(Duration::from_secs(3600)).await,
        Err(MonitorError::AlreadyRunning)
    );

    service.stop_monitoring().await.unwrap();

    // can be started again after a stop
    service
        .start_monitoring(Duration::from_secs(3600))
        .await
        .unwrap();
    service.stop_monitoring().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_loop_collects_every_interval() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[1, 2]);

    service
        .start_monitoring(Duration::from_secs(60))
        .await
        .unwrap();

    // nothing before the first full interval
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(fleet.calls(), 0);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(fleet.calls(), 2);
    assert!(service.get_server_metrics(ResourceId(1)).await.is_ok());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fleet.calls(), 4);

    service.stop_monitoring().await.unwrap();

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fleet.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_zero_interval_runs_at_minimum_period() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[1]);

    service.start_monitoring(Duration::ZERO).await.unwrap();

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(fleet.calls(), 3);
    assert!(service.is_monitoring().await);

    let summary = service.collect_now().await.unwrap();
    assert_eq!(summary.succeeded, 1);

    service.stop_monitoring().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_update_interval_takes_effect() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[1]);

    service
        .start_monitoring(Duration::from_secs(3600))
        .await
        .unwrap();
    service.update_interval(5).await.unwrap();

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(fleet.calls(), 3);

    service.stop_monitoring().await.unwrap();
}

#[tokio::test]
async fn test_collect_now_runs_a_round() {
    let fleet = FakeFleet::with_cpu(20.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[1, 2, 3]);

    service
        .start_monitoring(Duration::from_secs(3600))
        .await
        .unwrap();

    let summary = service.collect_now().await.unwrap();
    assert_eq!(summary.resources, 3);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert!(summary.finished_at >= summary.started_at);

    service.stop_monitoring().await.unwrap();
}

#[tokio::test]
async fn test_round_respects_max_concurrency() {
    let fleet = FakeFleet {
        delay: Duration::from_millis(20),
        ..FakeFleet::with_cpu(20.0)
    };
    let config = MonitorConfig {
        max_concurrency: 2,
        ..MonitorConfig::default()
    };
    let (_, service) = create_test_service(&fleet, config, &[]);
    add_resources(&service, &[1, 2, 3, 4, 5, 6]).await;

    let summary = service.collect_round().await;

    assert_eq!(summary.succeeded, 6);
    assert_eq!(fleet.calls(), 6);
    assert!(fleet.peak_in_flight() <= 2);
}

#[tokio::test]
async fn test_round_runs_collections_in_parallel() {
    let fleet = FakeFleet {
        delay: Duration::from_millis(50),
        ..FakeFleet::with_cpu(20.0)
    };
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    add_resources(&service, &[1, 2, 3, 4]).await;

    service.collect_round().await;

    assert_eq!(fleet.peak_in_flight(), 4);
}

#[tokio::test]
async fn test_overlapping_rounds_never_backdate_snapshot() {
    // the first collection is slow, the second fast
    let fleet = FakeFleet {
        delay: Duration::from_millis(200),
        delay_step: Duration::from_millis(150),
        ..FakeFleet::with_cpu(20.0)
    };
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(1)).await.unwrap();

    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.collect_round().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second_requested = Utc::now();
    let second = service.collect_round().await;
    let first = first.await.unwrap();

    assert_eq!(first.succeeded, 1);
    assert_eq!(second.succeeded, 1);
    assert_eq!(fleet.calls(), 2);
    assert_eq!(fleet.peak_in_flight(), 1);

    let cached = service.get_server_metrics(ResourceId(1)).await.unwrap();
    assert!(cached.timestamp >= second_requested);
}
