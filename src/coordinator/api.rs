//! HTTP and WebSocket handlers for the coordinator
//!
//! This module defines the coordinator's routes: the registration protocol,
//! the launch delegation, registry/log enumeration, the synchronization
//! trigger, and the observer WebSocket. Any path that is not a named route
//! accepts a WebSocket upgrade, so dashboards can attach wherever they like.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::coordinator::registry::Instance;
use crate::coordinator::server::AppState;
use crate::coordinator::sync::RoundReport;
use crate::metrics;

// ============================================================================
// API Request/Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Request to launch a node on a remote host
#[derive(Debug, Deserialize)]
pub struct LaunchRequest {
    pub host: String,
}

/// Response to a successful launch
#[derive(Debug, Serialize)]
pub struct LaunchResponse {
    pub port: u16,
}

/// Log history response
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

/// Forwarded log line from a node
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub message: String,
}

/// Synchronization round response
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: RoundReport,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the coordinator router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_instance))
        .route("/launch", post(launch_instance))
        .route("/instances", get(list_instances))
        .route("/logs", get(get_logs).post(ingest_log))
        .route("/sync-clocks", post(sync_clocks))
        .route("/worldtime", get(world_time))
        .route("/metrics", get(get_metrics))
        .fallback(observer_socket)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            journal_requests,
        ))
        .with_state(state)
}

/// Record every inbound request in the journal
async fn journal_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let line = format!("{} {}", req.method(), req.uri());
    state.journal.record(line).await;
    next.run(req).await
}

// ============================================================================
// Registry Handlers
// ============================================================================

/// Register a node announced over the registration protocol
async fn register_instance(
    State(state): State<AppState>,
    Json(instance): Json<Instance>,
) -> impl IntoResponse {
    let count = state.registry.register(instance).await;
    metrics::set_registered_instances(count);

    (StatusCode::OK, "Instance registered")
}

/// Launch a node on a remote host, then register it
///
/// The launch flow both returns the assigned port to the caller and registers
/// the instance itself; callers must not treat the returned port as "not yet
/// registered".
async fn launch_instance(
    State(state): State<AppState>,
    Json(request): Json<LaunchRequest>,
) -> Response {
    state
        .journal
        .record(format!("Launching instance on {}", request.host))
        .await;

    match state.launcher.launch(&request.host).await {
        Ok(port) => {
            let count = state
                .registry
                .register(Instance::new(request.host, port))
                .await;
            metrics::set_registered_instances(count);

            (StatusCode::OK, Json(LaunchResponse { port })).into_response()
        }
        Err(e) => {
            state
                .journal
                .record(format!("Failed to launch instance on {}: {e}", request.host))
                .await;

            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            )
                .into_response()
        }
    }
}

/// List all registered instances in insertion order
async fn list_instances(State(state): State<AppState>) -> Json<Vec<Instance>> {
    Json(state.registry.list().await)
}

// ============================================================================
// Log Handlers
// ============================================================================

/// Full journal history
async fn get_logs(State(state): State<AppState>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.journal.snapshot().await,
    })
}

/// Ingest a log line forwarded by a node (best-effort side channel)
async fn ingest_log(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> impl IntoResponse {
    state.journal.record(request.message).await;
    StatusCode::OK
}

// ============================================================================
// Synchronization Handlers
// ============================================================================

/// Trigger one synchronization round
async fn sync_clocks(State(state): State<AppState>) -> Response {
    match state.engine.run_round().await {
        Ok(report) => (
            StatusCode::OK,
            Json(SyncResponse {
                message: "Synchronization complete".to_string(),
                report,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Proxy the external time authority
async fn world_time(State(state): State<AppState>) -> Response {
    match state.authority.reference_time().await {
        Ok(datetime) => (
            StatusCode::OK,
            Json(serde_json::json!({ "datetime": datetime })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Metrics Handler
// ============================================================================

/// Prometheus text exposition
async fn get_metrics() -> impl IntoResponse {
    (StatusCode::OK, metrics::render())
}

// ============================================================================
// Observer WebSocket
// ============================================================================

/// Accept a WebSocket upgrade on any unrouted path
async fn observer_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| observer_loop(socket, state))
}

/// Serve one observer: snapshot first, then live events until disconnect
async fn observer_loop(socket: WebSocket, state: AppState) {
    // Subscribe before the snapshot so no event falls between the two
    let mut events = state.bus.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let snapshot = state.registry.list().await;
    let frame = serde_json::to_string(&snapshot).unwrap_or_else(|_| "[]".to_string());
    if sender.send(Message::Text(frame.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => {
                    if sender.send(Message::Text(event.to_frame().into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = receiver.next() => match incoming {
                None | Some(Err(_)) => break,
                Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
