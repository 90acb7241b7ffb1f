//! 实例选择与心跳集成测试

mod common;

use common::{FakeNacos, Fault, wait_until};
use nacos_client_core::{
    ConsistencyType, ExecutionMode, HeartbeatOptions, Instance, InstanceQuery, InstanceSpec,
    MetadataBatch, NacosError, NamingService,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn naming(fake: &Arc<FakeNacos>) -> NamingService {
    NamingService::new(fake.clone()).with_heartbeat_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn select_one_healthy_follows_weights() {
    let fake = FakeNacos::new();
    fake.add_host(Instance::new("10.0.0.1", 8080).with_weight(1.0));
    fake.add_host(Instance::new("10.0.0.2", 8080).with_weight(3.0));
    fake.add_host(Instance::new("10.0.0.3", 8080).with_health(false));
    let naming = naming(&fake);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..2000 {
        let chosen = assert_ok!(naming.select_one_healthy("orders", &InstanceQuery::new()).await);
        *counts.entry(chosen.ip).or_default() += 1;
    }
    assert!(!counts.contains_key("10.0.0.3"));
    let heavy = counts.get("10.0.0.2").copied().unwrap_or_default() as f64 / 2000.0;
    assert!((heavy - 0.75).abs() < 0.05, "heavy share {}", heavy);
}

#[tokio::test]
async fn select_from_empty_service_fails() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    let err = assert_err!(naming.select_one_healthy("orders", &InstanceQuery::new()).await);
    assert!(matches!(err, NacosError::EmptyCandidateSet(_)));
}

#[tokio::test]
async fn list_honours_healthy_only() {
    let fake = FakeNacos::new();
    fake.add_host(Instance::new("10.0.0.1", 8080));
    fake.add_host(Instance::new("10.0.0.2", 8080).with_health(false));
    let naming = naming(&fake);

    let all = assert_ok!(naming.list("orders", &InstanceQuery::new()).await);
    assert_eq!(all.name.as_deref(), Some("orders"));
    assert_eq!(all.hosts.len(), 2);

    let healthy = assert_ok!(
        naming
            .list("orders", &InstanceQuery::new().healthy_only(true))
            .await
    );
    assert_eq!(healthy.hosts.len(), 1);
    assert_eq!(healthy.hosts[0].ip, "10.0.0.1");
}

#[tokio::test]
async fn register_and_deregister() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    let spec = InstanceSpec::new("orders", "10.0.0.9", 9000).with_weight(2.0);

    assert!(assert_ok!(naming.register(&spec).await));
    assert_eq!(fake.hosts().len(), 1);
    assert_eq!(fake.hosts()[0].weight, 2.0);

    assert!(assert_ok!(naming.deregister(&spec).await));
    assert!(fake.hosts().is_empty());
}

#[tokio::test]
async fn batch_metadata_targets_selected_instances() {
    let fake = FakeNacos::new();
    let first = InstanceSpec::new("orders", "10.0.0.1", 8080);
    let second = InstanceSpec::new("orders", "10.0.0.2", 8080);
    let naming = naming(&fake).with_default_namespace("dev");
    assert!(assert_ok!(naming.register(&first).await));
    assert!(assert_ok!(naming.register(&second).await));

    let batch = MetadataBatch::new("orders")
        .with_consistency(ConsistencyType::Ephemeral)
        .with_instance(&first)
        .with_metadata("zone", "a");
    let resp = assert_ok!(naming.batch_update_metadata(&batch).await);
    assert_eq!(resp.updated, vec!["10.0.0.1:8080".to_string()]);

    let hosts = fake.hosts();
    assert_eq!(hosts[0].metadata.get("zone").map(String::as_str), Some("a"));
    assert!(hosts[1].metadata.is_empty());

    let request = fake.last_request().unwrap();
    assert_eq!(request.query_param("namespaceId"), Some("dev"));
    assert_eq!(request.query_param("consistencyType"), Some("ephemeral"));
    assert_eq!(request.query_param("metadata"), Some(r#"{"zone":"a"}"#));

    // 不指定实例时作用于全部实例
    let everyone = MetadataBatch::new("orders").with_metadata("tier", "gold");
    let resp = assert_ok!(naming.batch_update_metadata(&everyone).await);
    assert_eq!(resp.updated.len(), 2);

    let removal = MetadataBatch::new("orders").with_metadata("zone", "");
    assert_ok!(naming.batch_delete_metadata(&removal).await);
    let hosts = fake.hosts();
    assert!(hosts.iter().all(|h| !h.metadata.contains_key("zone")));
    assert!(hosts.iter().all(|h| h.metadata.get("tier").map(String::as_str) == Some("gold")));
}

#[tokio::test]
async fn batch_metadata_surfaces_server_rejection() {
    let fake = FakeNacos::new();
    fake.set_fault(Some(Fault::Status(400)));
    let naming = naming(&fake);
    let batch = MetadataBatch::new("orders").with_metadata("zone", "a");
    let err = assert_err!(naming.batch_update_metadata(&batch).await);
    assert_eq!(err.status(), Some(400));
}

#[tokio::test]
async fn beat_parses_response() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    let resp = assert_ok!(naming.beat(&InstanceSpec::new("orders", "10.0.0.1", 80)).await);
    assert_eq!(resp.client_beat_interval, Some(5000));
    assert_eq!(fake.beats(), 1);
}

#[tokio::test]
async fn heartbeat_beats_until_cancelled() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    let handle = assert_ok!(naming.heartbeat(InstanceSpec::new("orders", "10.0.0.1", 80)));

    assert!(wait_until(Duration::from_secs(2), || fake.beats() >= 3).await);
    handle.cancel();
    handle.cancel();
    let joined = tokio::time::timeout(Duration::from_secs(2), handle.join()).await;
    assert_ok!(assert_ok!(joined));

    let stopped_at = fake.beats();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fake.beats(), stopped_at);
}

#[tokio::test]
async fn heartbeat_skips_errors_by_default() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    fake.set_fault(Some(Fault::Network));
    let handle = assert_ok!(naming.heartbeat(InstanceSpec::new("orders", "10.0.0.1", 80)));

    assert!(wait_until(Duration::from_secs(2), || fake.calls().len() >= 3).await);
    fake.set_fault(None);
    assert!(wait_until(Duration::from_secs(2), || fake.beats() >= 1).await);
    assert!(!handle.is_cancelled());
    handle.cancel();
}

#[tokio::test]
async fn heartbeat_stops_on_error_when_not_skipping() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    fake.set_fault(Some(Fault::Status(500)));

    let options = HeartbeatOptions::default()
        .with_interval(Duration::from_millis(10))
        .with_skip_errors(false);
    let handle = assert_ok!(
        naming.heartbeat_with_options(InstanceSpec::new("orders", "10.0.0.1", 80), options)
    );

    let joined = tokio::time::timeout(Duration::from_secs(2), handle.join()).await;
    let err = assert_err!(assert_ok!(joined));
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn thread_mode_heartbeat() {
    let fake = FakeNacos::new();
    let naming = naming(&fake);
    let options = HeartbeatOptions::default()
        .with_interval(Duration::from_millis(10))
        .with_mode(ExecutionMode::Thread);
    let handle = assert_ok!(
        naming.heartbeat_with_options(InstanceSpec::new("orders", "10.0.0.1", 80), options)
    );

    assert!(wait_until(Duration::from_secs(2), || fake.beats() >= 2).await);
    handle.cancel();
    let joined = tokio::time::timeout(Duration::from_secs(2), handle.join()).await;
    assert_ok!(assert_ok!(joined));
}
