//! Staleness-based liveness tests
//!
//! These tests verify that:
//! - A fresh snapshot makes a resource online
//! - An old snapshot, or none at all, makes it offline
//! - Snapshots vanish from reads once their TTL elapses
//! - System stats count every registered resource

use std::time::Duration;

use assert_matches::assert_matches;
use fleet_monitor::ResourceId;
use fleet_monitor::config::MonitorConfig;
use fleet_monitor::error::MonitorError;
use fleet_monitor::monitors::liveness::ServerStatus;
use pretty_assertions::assert_eq;

use crate::helpers::*;

#[tokio::test]
async fn test_collected_resource_is_online() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    let summary = service.collect_round().await;

    let snapshot = service.get_server_metrics(ResourceId(7)).await.unwrap();
    assert_eq!(snapshot.server_id, ResourceId(7));
    assert_eq!(snapshot.cpu.usage, 35.0);
    // captured during the round that stored it
    assert!(summary.started_at <= snapshot.timestamp);
    assert!(snapshot.timestamp <= summary.finished_at);
    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Online
    );
}

#[tokio::test]
async fn test_registered_but_never_collected_is_offline() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Offline
    );
    assert_matches!(
        service.get_server_metrics(ResourceId(7)).await,
        Err(MonitorError::NotFound(ResourceId(7)))
    );
}

#[tokio::test]
async fn test_old_snapshot_is_offline() {
    let fleet = FakeFleet {
        age_secs: 6 * 60,
        ..FakeFleet::with_cpu(35.0)
    };
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    service.collect_round().await;

    // still cached, but too old to prove the resource is alive
    assert!(service.get_server_metrics(ResourceId(7)).await.is_ok());
    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Offline
    );
}

#[tokio::test]
async fn test_snapshot_just_inside_staleness_is_online() {
    let fleet = FakeFleet {
        age_secs: 4 * 60 + 59,
        ..FakeFleet::with_cpu(35.0)
    };
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    service.collect_round().await;

    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Online
    );
}

#[tokio::test]
async fn test_custom_staleness_threshold() {
    let fleet = FakeFleet {
        age_secs: 90,
        ..FakeFleet::with_cpu(35.0)
    };
    let config = MonitorConfig {
        staleness: 60,
        ..MonitorConfig::default()
    };
    let (_, service) = create_test_service(&fleet, config, &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    service.collect_round().await;

    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Offline
    );
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_expires_after_ttl() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    service.add_resource(ResourceId(7)).await.unwrap();

    service.collect_round().await;
    assert!(service.get_server_metrics(ResourceId(7)).await.is_ok());

    tokio::time::advance(Duration::from_secs(6 * 60)).await;

    assert_matches!(
        service.get_server_metrics(ResourceId(7)).await,
        Err(MonitorError::NotFound(ResourceId(7)))
    );
    assert_eq!(
        service.get_server_status(ResourceId(7)).await,
        ServerStatus::Offline
    );
}

#[tokio::test]
async fn test_unknown_resource_is_offline() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);

    assert_eq!(
        service.get_server_status(ResourceId(404)).await,
        ServerStatus::Offline
    );
}

#[tokio::test]
async fn test_system_stats_counts_registry() {
    let fleet = FakeFleet::with_cpu(35.0).failing(&[3]);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    add_resources(&service, &[1, 2, 3]).await;

    service.collect_round().await;

    let stats = service.get_system_stats().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.online, 2);
    assert_eq!(stats.offline, 1);
}

#[tokio::test]
async fn test_system_stats_served_from_cache() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);
    add_resources(&service, &[1]).await;
    service.collect_round().await;

    let first = service.get_system_stats().await;

    service.add_resource(ResourceId(2)).await.unwrap();
    let second = service.get_system_stats().await;

    assert_eq!(second, first);
    assert_eq!(second.total, 1);
}

#[tokio::test]
async fn test_empty_registry_stats() {
    let fleet = FakeFleet::with_cpu(35.0);
    let (_, service) = create_test_service(&fleet, MonitorConfig::default(), &[]);

    let stats = service.get_system_stats().await;
    assert_eq!((stats.total, stats.online, stats.offline), (0, 0, 0));
}
