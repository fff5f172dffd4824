//! Synchronization round integration tests
//!
//! Drives the engine against wiremock-backed nodes and time authority:
//! 1. A full round computes the average offset and pushes per-node corrections
//! 2. A partially unreachable fleet still completes the round
//! 3. An empty registry reports NoInstancesAvailable without pushing anything
//! 4. A down authority aborts the round

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use chronod::coordinator::authority::WorldTimeClient;
use chronod::coordinator::broadcast::EventBus;
use chronod::coordinator::registry::{Instance, InstanceRegistry};
use chronod::coordinator::sync::{SyncEngine, SyncError};
use chronod::journal::Journal;

// Mock nodes report observed seconds of 10 + offset against this reference
const REFERENCE: &str = "2024-05-21T12:00:10";

/// Matches a /sync push whose offset is within a millisecond of the expected
/// correction
struct OffsetNear(f64);

impl wiremock::Match for OffsetNear {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<serde_json::Value>(&request.body)
            .ok()
            .and_then(|v| v.get("offset").and_then(|o| o.as_f64()))
            .map(|o| (o - self.0).abs() < 1e-3)
            .unwrap_or(false)
    }
}

async fn authority_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/worldtime"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "dateTime": REFERENCE })),
        )
        .mount(&server)
        .await;
    server
}

/// Node mock reporting a clock `offset_secs` ahead of the reference and
/// expecting exactly one correction push of `expected_correction`
async fn node_server(offset_secs: i64, expected_correction: f64) -> MockServer {
    let server = MockServer::start().await;

    let observed = format!("2024-05-21T12:00:{:02}Z", offset_secs + 10);
    Mock::given(method("GET"))
        .and(path("/time"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "time": observed })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/sync"))
        .and(OffsetNear(expected_correction))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Logical time synchronized successfully",
            "new_time": "12:00:00",
        })))
        .expect(1)
        .mount(&server)
        .await;

    server
}

struct Harness {
    registry: Arc<InstanceRegistry>,
    journal: Arc<Journal>,
    engine: SyncEngine,
}

fn harness(authority_uri: &str) -> Harness {
    let journal = Arc::new(Journal::new());
    let registry = Arc::new(InstanceRegistry::new(EventBus::new(64), journal.clone()));
    let authority = Arc::new(
        WorldTimeClient::new(
            format!("{authority_uri}/worldtime"),
            Duration::from_millis(500),
        )
        .unwrap(),
    );
    let engine = SyncEngine::new(
        registry.clone(),
        journal.clone(),
        authority,
        Duration::from_millis(500),
    )
    .unwrap();

    Harness {
        registry,
        journal,
        engine,
    }
}

async fn register_mock(registry: &InstanceRegistry, server: &MockServer) {
    let addr = server.address();
    registry
        .register(Instance::new(addr.ip().to_string(), addr.port()))
        .await;
}

#[tokio::test]
async fn full_round_pushes_per_node_corrections() {
    let authority = authority_server().await;

    // Observed offsets +2, -2, +4 against the reference; average is +4/3,
    // so the corrections are average - offset per node.
    let ahead_two = node_server(2, 4.0 / 3.0 - 2.0).await;
    let behind_two = node_server(-2, 4.0 / 3.0 + 2.0).await;
    let ahead_four = node_server(4, 4.0 / 3.0 - 4.0).await;

    let h = harness(&authority.uri());
    register_mock(&h.registry, &ahead_two).await;
    register_mock(&h.registry, &behind_two).await;
    register_mock(&h.registry, &ahead_four).await;

    let report = h.engine.run_round().await.unwrap();

    assert_eq!(report.polled, 3);
    assert_eq!(report.failed_polls, 0);
    assert!((report.average_offset - 4.0 / 3.0).abs() < 1e-9);
    assert_eq!(report.corrected, 3);
    assert_eq!(report.failed_corrections, 0);

    // Journal carries one synchronization line per node
    let lines = h.journal.snapshot().await;
    let synced = lines
        .iter()
        .filter(|l| l.contains("Synchronized") && l.contains("correction"))
        .count();
    assert_eq!(synced, 3);
}

#[tokio::test]
async fn unreachable_node_is_excluded_but_round_completes() {
    let authority = authority_server().await;

    // Two reachable nodes at +2 and +4; average is +3
    let ahead_two = node_server(2, 1.0).await;
    let ahead_four = node_server(4, -1.0).await;

    let h = harness(&authority.uri());
    register_mock(&h.registry, &ahead_two).await;
    // Nothing listens on port 1
    h.registry.register(Instance::new("127.0.0.1", 1)).await;
    register_mock(&h.registry, &ahead_four).await;

    let report = h.engine.run_round().await.unwrap();

    assert_eq!(report.polled, 2);
    assert_eq!(report.failed_polls, 1);
    assert!((report.average_offset - 3.0).abs() < 1e-9);
    assert_eq!(report.corrected, 2);

    let lines = h.journal.snapshot().await;
    assert!(lines
        .iter()
        .any(|l| l.contains("Failed to read time from instance 127.0.0.1:1")));
}

#[tokio::test]
async fn duplicate_registration_is_polled_twice() {
    let authority = authority_server().await;

    // One node registered twice: polled twice, corrected twice, both with a
    // zero correction since it defines the average by itself.
    let node = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "time": "2024-05-21T12:00:12Z" }),
        ))
        .expect(2)
        .mount(&node)
        .await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .and(OffsetNear(0.0))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Logical time synchronized successfully",
            "new_time": "12:00:12",
        })))
        .expect(2)
        .mount(&node)
        .await;

    let h = harness(&authority.uri());
    register_mock(&h.registry, &node).await;
    register_mock(&h.registry, &node).await;

    let report = h.engine.run_round().await.unwrap();
    assert_eq!(report.polled, 2);
    assert_eq!(report.corrected, 2);
}

#[tokio::test]
async fn empty_registry_reports_no_instances() {
    let authority = authority_server().await;
    let h = harness(&authority.uri());

    let result = h.engine.run_round().await;
    assert!(matches!(result, Err(SyncError::NoInstancesAvailable)));

    let lines = h.journal.snapshot().await;
    assert!(lines
        .iter()
        .any(|l| l.contains("No instances available for synchronization")));
}

#[tokio::test]
async fn all_nodes_unreachable_reports_no_instances() {
    let authority = authority_server().await;
    let h = harness(&authority.uri());

    h.registry.register(Instance::new("127.0.0.1", 1)).await;
    h.registry.register(Instance::new("127.0.0.1", 2)).await;

    let result = h.engine.run_round().await;
    assert!(matches!(result, Err(SyncError::NoInstancesAvailable)));
}

#[tokio::test]
async fn down_authority_aborts_the_round() {
    let authority = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/worldtime"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&authority)
        .await;

    // A healthy node that must never be polled
    let node = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "time": "2024-05-21T12:00:00Z" }),
        ))
        .expect(0)
        .mount(&node)
        .await;

    let h = harness(&authority.uri());
    register_mock(&h.registry, &node).await;

    let result = h.engine.run_round().await;
    assert!(matches!(result, Err(SyncError::TimeAuthority(_))));
}

#[tokio::test]
async fn failed_correction_push_does_not_abort_the_round() {
    let authority = authority_server().await;

    // Two nodes at +2 and -2; the first rejects its correction push
    let rejecting = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "time": "2024-05-21T12:00:12Z" }),
        ))
        .mount(&rejecting)
        .await;
    Mock::given(method("POST"))
        .and(path("/sync"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&rejecting)
        .await;

    let accepting = node_server(-2, 2.0).await;

    let h = harness(&authority.uri());
    register_mock(&h.registry, &rejecting).await;
    register_mock(&h.registry, &accepting).await;

    let report = h.engine.run_round().await.unwrap();

    assert_eq!(report.polled, 2);
    assert_eq!(report.corrected, 1);
    assert_eq!(report.failed_corrections, 1);

    let lines = h.journal.snapshot().await;
    assert!(lines.iter().any(|l| l.contains("Failed to synchronize instance")));
}
