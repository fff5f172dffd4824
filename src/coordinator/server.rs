//! Coordinator server implementation
//!
//! This module wires the registry, journal, broadcast bus, synchronization
//! engine, and external collaborators into one HTTP service.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::coordinator::api::create_router;
use crate::coordinator::authority::{TimeAuthority, WorldTimeClient};
use crate::coordinator::broadcast::{BusSink, EventBus};
use crate::coordinator::config::CoordinatorConfig;
use crate::coordinator::launcher::{CommandLauncher, InstanceLauncher};
use crate::coordinator::registry::InstanceRegistry;
use crate::coordinator::sync::SyncEngine;
use crate::journal::Journal;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Instance registry
    pub registry: Arc<InstanceRegistry>,

    /// Coordinator journal (bus-backed)
    pub journal: Arc<Journal>,

    /// Event broadcast bus
    pub bus: EventBus,

    /// Synchronization engine
    pub engine: Arc<SyncEngine>,

    /// Reference time authority
    pub authority: Arc<dyn TimeAuthority>,

    /// Remote instance launcher
    pub launcher: Arc<dyn InstanceLauncher>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: CoordinatorConfig,
}

// ============================================================================
// Coordinator Server
// ============================================================================

/// Main coordinator server
pub struct CoordinatorServer {
    config: CoordinatorConfig,
    state: AppState,
}

impl CoordinatorServer {
    /// Create a coordinator server with the production collaborators
    pub fn new(config: CoordinatorConfig) -> Result<Self, ServerError> {
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let authority: Arc<dyn TimeAuthority> = Arc::new(
            WorldTimeClient::new(&config.authority_url, timeout)
                .map_err(|e| ServerError::InitError(e.to_string()))?,
        );
        let launcher: Arc<dyn InstanceLauncher> = Arc::new(CommandLauncher::new(
            &config.launch_command,
            config.launch_port_min,
            config.launch_port_max,
        ));

        Self::with_collaborators(config, authority, launcher)
    }

    /// Create a coordinator server with injected collaborators
    pub fn with_collaborators(
        config: CoordinatorConfig,
        authority: Arc<dyn TimeAuthority>,
        launcher: Arc<dyn InstanceLauncher>,
    ) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let bus = EventBus::new(config.bus_capacity);
        let journal = Arc::new(Journal::with_sink(Arc::new(BusSink::new(bus.clone()))));
        let registry = Arc::new(InstanceRegistry::new(bus.clone(), journal.clone()));

        let engine = Arc::new(
            SyncEngine::new(
                registry.clone(),
                journal.clone(),
                authority.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )
            .map_err(|e| ServerError::InitError(e.to_string()))?,
        );

        let state = AppState {
            registry,
            journal,
            bus,
            engine,
            authority,
            launcher,
            start_time: Instant::now(),
            config: config.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        // Add CORS layer if enabled
        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        // Add tracing layer if enabled
        if self.config.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting coordinator on {}", addr);
        self.state.journal.record(format!("Coordinator running at {}", addr.port())).await;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        Ok(())
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.bind_address;

        tracing::info!("Starting coordinator on {} (with graceful shutdown)", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        self.state.journal.record(format!("Coordinator running at {}", addr.port())).await;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("Coordinator shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.bind_address,
            authority_url: self.config.authority_url.clone(),
            request_timeout_secs: self.config.request_timeout_secs,
            launch_port_range: (self.config.launch_port_min, self.config.launch_port_max),
            cors_enabled: self.config.enable_cors,
            request_logging_enabled: self.config.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub authority_url: String,
    pub request_timeout_secs: u64,
    pub launch_port_range: (u16, u16),
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Coordinator Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Time Authority: {}\n\
             Request Timeout: {}s\n\
             Launch Ports: {}-{}\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.authority_url,
            self.request_timeout_secs,
            self.launch_port_range.0,
            self.launch_port_range.1,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
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
