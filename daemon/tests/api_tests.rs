use std::sync::Arc;
use std::time::Duration;

use cns_daemon::{build_router, AppState, DataResponse, ErrorResponse, HealthResponse};
use cns_sync::mock::{MockBroadcast, MockUpstream};
use cns_sync::{
    Broadcast, BroadcastMessage, ConnectionState, HttpBroadcast, HttpBroadcastConfig, SyncConfig,
    SyncCoordinator,
};
use cns_types::{ContextId, NodeId};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const CTX: &str = "ctx-1";

fn node() -> Value {
    json!({
        "name": "n1",
        "title": "Node one",
        "capabilities": {"cap1": {"scope": "s", "connections": {"c1": {"status": "up", "provider": "p1"}}}}
    })
}

struct TestServer {
    base: String,
    upstream: Arc<MockUpstream>,
    broadcast: Arc<MockBroadcast>,
    coordinator: Arc<SyncCoordinator>,
}

/// Spin up the HTTP server on an OS-assigned port.
async fn spawn_test_server_with(inbound: Option<Arc<HttpBroadcast>>) -> TestServer {
    let upstream = Arc::new(MockUpstream::new());
    upstream.set_profile("router", json!({"schema": {"version": 2}}));
    let broadcast = Arc::new(MockBroadcast::new());
    let coordinator = Arc::new(SyncCoordinator::new(
        SyncConfig::new(CTX),
        upstream.clone(),
        broadcast.clone(),
        upstream.clone(),
    ));
    coordinator
        .attach(ContextId::new(CTX), node())
        .await
        .unwrap();

    let app = build_router(Arc::new(
        AppState::new(coordinator.clone()).with_inbound(inbound),
    ));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        upstream,
        broadcast,
        coordinator,
    }
}

async fn spawn_test_server() -> TestServer {
    spawn_test_server_with(None).await
}

async fn post(url: String, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(url)
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn read_context_value() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/node/contexts/ctx-1/title", server.base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data, json!("Node one"));
}

#[tokio::test]
async fn read_whole_node() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/node", server.base)).await.unwrap();

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data["contexts"]["ctx-1"], node());
    assert_eq!(body.data["broker"], json!("mock"));
}

#[tokio::test]
async fn read_profile() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/profiles/router/schema", server.base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data, json!({"version": 2}));
}

#[tokio::test]
async fn read_missing_returns_404() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/node/contexts/ctx-1/nope", server.base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
    let body: ErrorResponse = resp.json().await.unwrap();
    assert!(body.error.contains("not found"));
}

#[tokio::test]
async fn write_returns_diff_and_propagates() {
    let server = spawn_test_server().await;
    let resp = post(
        format!("{}/node/contexts/ctx-1/capabilities/cap1/connections/c1", server.base),
        r#"{"status":"down"}"#,
    )
    .await;

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    let expected = json!({"capabilities": {"cap1": {"connections": {"c1": {"status": "down"}}}}});
    assert_eq!(body.data, expected);
    assert_eq!(server.upstream.pushes()[0].diff, expected);
    assert_eq!(server.broadcast.published().len(), 1);
}

#[tokio::test]
async fn write_errors_map_to_status_codes() {
    let server = spawn_test_server().await;
    let cases = [
        ("/node/contexts/ctx-1/name", "\"x\"", 403),
        ("/node/contexts/other/title", "\"x\"", 403),
        ("/node/contexts/ctx-1/capabilities/cap2/properties/a", "1", 404),
        ("/node/contexts/ctx-1/capabilities/cap1/connections/c1", r#"{"rate":1}"#, 409),
        ("/node/contexts/ctx-1/capabilities/cap1/connections", "1", 409),
    ];

    for (path, body, status) in cases {
        let resp = post(format!("{}{}", server.base, path), body).await;
        assert_eq!(resp.status(), status, "{path}");
        let error: ErrorResponse = resp.json().await.unwrap();
        assert!(!error.error.is_empty());
    }

    assert_eq!(
        server.coordinator.snapshot(&ContextId::new(CTX)).await,
        Some(node())
    );
}

#[tokio::test]
async fn empty_object_write_is_noop() {
    let server = spawn_test_server().await;
    let resp = post(format!("{}/node/contexts/ctx-1/title", server.base), "{}").await;

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data, json!({}));
    assert!(server.upstream.pushes().is_empty());
}

#[tokio::test]
async fn write_to_node_root_is_forbidden() {
    let server = spawn_test_server().await;
    let resp = post(format!("{}/node", server.base), r#"{"version":"x"}"#).await;

    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn healthz_reports_connection() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/healthz", server.base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "ok");
    assert_eq!(body.connection, ConnectionState::Online);
}

#[tokio::test]
async fn topics_route_without_sidecar_returns_404() {
    let server = spawn_test_server().await;
    let message = BroadcastMessage::new(NodeId::new(), json!({"a": 1}));
    let resp = reqwest::Client::new()
        .post(format!("{}/topics/node/contexts/ctx-1", server.base))
        .json(&message)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn topics_route_delivers_to_sidecar_subscribers() {
    let inbound = Arc::new(HttpBroadcast::new(HttpBroadcastConfig::default()).unwrap());
    let mut rx = inbound.subscribe("node/contexts/ctx-1").await.unwrap();
    let server = spawn_test_server_with(Some(inbound.clone())).await;

    let message = BroadcastMessage::new(NodeId::new(), json!({"title": "t"}));
    let resp = reqwest::Client::new()
        .post(format!("{}/topics/node/contexts/ctx-1", server.base))
        .json(&message)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data, json!(1));

    let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap();
    assert_eq!(received, Some(json!({"title": "t"})));

    // The sidecar's own publications are dropped.
    let own = BroadcastMessage::new(inbound.origin(), json!({"title": "echo"}));
    let resp = reqwest::Client::new()
        .post(format!("{}/topics/node/contexts/ctx-1", server.base))
        .json(&own)
        .send()
        .await
        .unwrap();
    let body: DataResponse = resp.json().await.unwrap();
    assert_eq!(body.data, json!(0));
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let server = spawn_test_server().await;
    let resp = reqwest::get(format!("{}/api/v1/nonexistent", server.base))
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}
