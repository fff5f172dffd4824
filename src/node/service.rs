//! Time node service
//!
//! Hosts a logical clock over HTTP, announces itself to the coordinator, and
//! answers the synchronization protocol. Startup order: bind the listener,
//! start the one-second tick loop, attempt a single self-registration (a
//! failure is journaled and does not abort startup), then apply the one-time
//! random skew that models unsynchronized drift.

use std::sync::Arc;
use std::time::Duration;

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
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use tokio::sync::{broadcast, RwLock};
use tower_http::trace::TraceLayer;

use crate::coordinator::client::{ClientConfig, CoordinatorClient, UplinkSink};
use crate::journal::Journal;
use crate::node::clock::{random_skew, LogicalClock};
use crate::node::config::NodeConfig;

// ============================================================================
// Node State
// ============================================================================

/// Shared node state
#[derive(Clone)]
pub struct NodeState {
    /// The node's logical clock
    pub clock: Arc<RwLock<LogicalClock>>,

    /// Node-local journal
    pub journal: Arc<Journal>,

    /// Per-second display-time feed for the node's own observers
    pub ticker: broadcast::Sender<String>,
}

// ============================================================================
// Node Server
// ============================================================================

/// Main time node server
pub struct NodeServer {
    config: NodeConfig,
    state: NodeState,
    client: Arc<CoordinatorClient>,
}

impl NodeServer {
    /// Create a node server from its configuration
    pub fn new(config: NodeConfig) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let client = Arc::new(
            CoordinatorClient::new(
                ClientConfig::new(&config.coordinator_url).with_timeout(config.timeout()),
            )
            .map_err(|e| ServerError::InitError(e.to_string()))?,
        );

        let journal = if config.forward_logs {
            Arc::new(Journal::with_sink(Arc::new(UplinkSink::new(client.clone()))))
        } else {
            Arc::new(Journal::new())
        };

        let (ticker, _) = broadcast::channel(32);

        let state = NodeState {
            clock: Arc::new(RwLock::new(LogicalClock::starting_now())),
            journal,
            ticker,
        };

        Ok(Self {
            config,
            state,
            client,
        })
    }

    /// Get the node state
    pub fn state(&self) -> NodeState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        create_router(self.state.clone()).layer(TraceLayer::new_for_http())
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = self.startup().await?;

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let listener = self.startup().await?;

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Node shutdown complete");
        Ok(())
    }

    /// Bind, start ticking, announce, then skew
    async fn startup(&self) -> Result<tokio::net::TcpListener, ServerError> {
        let addr = self.config.bind_address;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        self.state
            .journal
            .record(format!("Node running at {}", addr.port()))
            .await;

        self.start_tick_loop();
        self.announce().await;
        self.apply_startup_skew().await;

        Ok(listener)
    }

    /// Advance the clock once a second and feed connected observers
    fn start_tick_loop(&self) {
        let clock = self.state.clock.clone();
        let ticker = self.state.ticker.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let display = {
                    let mut clock = clock.write().await;
                    clock.tick();
                    clock.formatted()
                };
                // No observers is not an error
                let _ = ticker.send(display);
            }
        });
    }

    /// Single registration attempt; the node serves either way
    async fn announce(&self) {
        match self
            .client
            .register(&self.config.advertised_host, self.config.advertised_port())
            .await
        {
            Ok(body) => {
                self.state
                    .journal
                    .record(format!("Registered with coordinator: {body}"))
                    .await;
            }
            Err(e) => {
                self.state
                    .journal
                    .record(format!("Failed to register with coordinator: {e}"))
                    .await;
            }
        }
    }

    /// Apply the one-time random skew, after registration
    async fn apply_startup_skew(&self) {
        let skew = random_skew(self.config.skew_range_secs);
        self.state.clock.write().await.apply_skew(skew);
        self.state
            .journal
            .record(format!("Applied offset: {skew} seconds"))
            .await;
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Create the node router
pub fn create_router(state: NodeState) -> Router {
    Router::new()
        .route("/time", get(get_time))
        .route("/sync", post(sync_clock))
        .route("/logs", get(get_logs))
        .fallback(observer_socket)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            journal_requests,
        ))
        .with_state(state)
}

/// Record every inbound request in the journal
async fn journal_requests(State(state): State<NodeState>, req: Request, next: Next) -> Response {
    let line = format!("{} {}", req.method(), req.uri());
    state.journal.record(line).await;
    next.run(req).await
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Serialize)]
struct TimeResponse {
    time: DateTime<Utc>,
}

/// Current logical clock value
async fn get_time(State(state): State<NodeState>) -> Json<TimeResponse> {
    Json(TimeResponse {
        time: state.clock.read().await.value(),
    })
}

/// Apply an externally supplied correction
///
/// The payload is checked at runtime so a non-numeric `offset` yields a 400
/// with the clock untouched, matching the wire contract the coordinator's
/// correction push relies on.
async fn sync_clock(
    State(state): State<NodeState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(offset) = payload.get("offset").and_then(|v| v.as_f64()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid offset value. It must be a number." })),
        )
            .into_response();
    };

    let result = state.clock.write().await.apply_correction(offset);

    match result {
        Ok(new_time) => {
            state
                .journal
                .record(format!("Synchronized logical time with offset: {offset} seconds"))
                .await;

            (
                StatusCode::OK,
                Json(json!({
                    "message": "Logical time synchronized successfully",
                    "new_time": new_time,
                })),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Node-local log history
async fn get_logs(State(state): State<NodeState>) -> Json<serde_json::Value> {
    Json(json!({ "logs": state.journal.snapshot().await }))
}

// ============================================================================
// Observer WebSocket
// ============================================================================

/// Accept a WebSocket upgrade on any unrouted path
async fn observer_socket(State(state): State<NodeState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| observer_loop(socket, state))
}

/// Push the display time to one observer, once on connect and then per tick
async fn observer_loop(socket: WebSocket, state: NodeState) {
    state.journal.record("New observer connected").await;

    let mut ticks = state.ticker.subscribe();
    let (mut sender, mut receiver) = socket.split();

    let current = state.clock.read().await.formatted();
    if sender
        .send(Message::Text(json!({ "time": current }).to_string().into()))
        .await
        .is_err()
    {
        state.journal.record("Observer disconnected").await;
        return;
    }

    loop {
        tokio::select! {
            tick = ticks.recv() => match tick {
                Ok(display) => {
                    let frame = json!({ "time": display }).to_string();
                    if sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                None | Some(Err(_)) => break,
                Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => {}
            },
        }
    }

    state.journal.record("Observer disconnected").await;
}

// ============================================================================
// Server Errors
// ============================================================================

/// Node server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================
