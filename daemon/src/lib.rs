//! HTTP API for the CNS node sync daemon.
//!
//! Reads and writes are served from the coordinator's node document:
//!
//! - `GET  /node[/{path}]`, `GET /profiles/{path}` read a value
//! - `POST /node/{path}` writes the request body as a payload
//! - `POST /topics/{topic}` accepts inbound broadcast messages from the sidecar
//! - `GET  /healthz` reports liveness and the upstream connection state
//!
//! Successful responses are `{"data": ...}`; failures are `{"error": ...}`.

pub mod config;

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use cns_sync::{BroadcastMessage, ConnectionState, HttpBroadcast, SyncCoordinator, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Shared state of the HTTP handlers.
pub struct AppState {
    pub coordinator: Arc<SyncCoordinator>,
    /// Sidecar client receiving `POST /topics/...`; `None` disables the route.
    pub inbound: Option<Arc<HttpBroadcast>>,
}

impl AppState {
    pub fn new(coordinator: Arc<SyncCoordinator>) -> Self {
        Self {
            coordinator,
            inbound: None,
        }
    }

    pub fn with_inbound(mut self, inbound: Option<Arc<HttpBroadcast>>) -> Self {
        self.inbound = inbound;
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DataResponse {
    pub data: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub connection: ConnectionState,
}

/// A [`SyncError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub SyncError);

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        ApiError(e)
    }
}

/// HTTP status for a sync error.
pub fn status_for(error: &SyncError) -> StatusCode {
    match error {
        SyncError::NotFound(_) => StatusCode::NOT_FOUND,
        SyncError::ReadOnly(_) => StatusCode::FORBIDDEN,
        SyncError::TypeMismatch(_) | SyncError::ContainmentViolation(_) => StatusCode::CONFLICT,
        SyncError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

type ApiResult = Result<Json<DataResponse>, ApiError>;

fn data(value: Value) -> Json<DataResponse> {
    Json(DataResponse { data: value })
}

async fn read_node(State(state): State<Arc<AppState>>) -> ApiResult {
    Ok(data(state.coordinator.read(cns_types::NODE_KEY).await?))
}

async fn read_node_path(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> ApiResult {
    let path = format!("{}/{path}", cns_types::NODE_KEY);
    Ok(data(state.coordinator.read(&path).await?))
}

async fn read_profile(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> ApiResult {
    let path = format!("{}/{path}", cns_types::PROFILES_KEY);
    Ok(data(state.coordinator.read(&path).await?))
}

async fn write_node(State(state): State<Arc<AppState>>, body: String) -> ApiResult {
    Ok(data(state.coordinator.write(cns_types::NODE_KEY, &body).await?))
}

async fn write_node_path(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    body: String,
) -> ApiResult {
    let path = format!("{}/{path}", cns_types::NODE_KEY);
    Ok(data(state.coordinator.write(&path, &body).await?))
}

async fn deliver_topic(
    State(state): State<Arc<AppState>>,
    Path(topic): Path<String>,
    Json(message): Json<BroadcastMessage>,
) -> ApiResult {
    let Some(inbound) = &state.inbound else {
        return Err(SyncError::NotFound(format!("topic {topic}")).into());
    };
    let delivered = inbound.deliver(&topic, message).await;
    debug!("Inbound message on {} reached {} subscribers", topic, delivered);
    Ok(data(Value::from(delivered)))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        connection: state.coordinator.status().report().connection,
    })
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/node", get(read_node).post(write_node))
        .route("/node/{*path}", get(read_node_path).post(write_node_path))
        .route("/profiles/{*path}", get(read_profile))
        .route("/topics/{*topic}", post(deliver_topic))
        .route("/healthz", get(healthz))
        .with_state(state)
}
