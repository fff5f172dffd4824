//! Coordinator client for time nodes
//!
//! This module provides the client a node uses to announce itself to the
//! coordinator and to forward its journal lines to the coordinator's log
//! ingestion endpoint.

use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::coordinator::registry::Instance;
use crate::journal::LogSink;

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the coordinator client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Coordinator base URL
    pub coordinator_url: String,

    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Create a new client config
    pub fn new(coordinator_url: impl Into<String>) -> Self {
        Self {
            coordinator_url: coordinator_url.into(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// Client Errors
// ============================================================================

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Initialization error
    #[error("initialization error: {0}")]
    InitError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// HTTP error
    #[error("HTTP error ({status}): {message}")]
    HttpError { status: u16, message: String },

    /// Parse error
    #[error("parse error: {0}")]
    ParseError(String),
}

// ============================================================================
// Coordinator Client
// ============================================================================

/// Client for communicating with the coordinator
pub struct CoordinatorClient {
    config: ClientConfig,
    http: Client,
}

impl CoordinatorClient {
    /// Create a new coordinator client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self { config, http })
    }

    /// Announce this node to the coordinator.
    ///
    /// A single attempt, no retry: the caller logs the outcome and continues
    /// either way, so a down coordinator never prevents a node from serving.
    pub async fn register(&self, host: &str, port: u16) -> Result<String, ClientError> {
        let url = format!("{}/register", self.config.coordinator_url);
        let instance = Instance::new(host, port);

        let response = self
            .http
            .post(&url)
            .json(&instance)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::HttpError {
                status: status.as_u16(),
                message: body,
            })
        }
    }

    /// Forward a journal line to the coordinator's log ingestion endpoint.
    ///
    /// Strictly best-effort: failures are recorded at debug level and
    /// swallowed, never retried.
    pub async fn forward_log(&self, line: &str) {
        let url = format!("{}/logs", self.config.coordinator_url);
        let body = json!({ "message": line });

        match self.http.post(&url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::debug!(
                    status = %response.status(),
                    "Coordinator rejected forwarded log line"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Failed to forward log line to coordinator: {e}");
            }
        }
    }
}

// ============================================================================
// Journal Sink
// ============================================================================

/// Journal sink that uplinks every recorded line to the coordinator
pub struct UplinkSink {
    client: Arc<CoordinatorClient>,
}

impl UplinkSink {
    pub fn new(client: Arc<CoordinatorClient>) -> Self {
        Self { client }
    }
}

impl LogSink for UplinkSink {
    fn emit(&self, line: &str) {
        let client = self.client.clone();
        let line = line.to_string();
        tokio::spawn(async move {
            client.forward_log(&line).await;
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("http://localhost:4000");
        assert_eq!(config.coordinator_url, "http://localhost:4000");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_client_config_with_timeout() {
        let config =
            ClientConfig::new("http://localhost:4000").with_timeout(Duration::from_secs(30));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_client_creation() {
        let config = ClientConfig::new("http://localhost:4000");
        assert!(CoordinatorClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_register_fails_against_unreachable_coordinator() {
        let config = ClientConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_millis(200));
        let client = CoordinatorClient::new(config).unwrap();

        let result = client.register("localhost", 3000).await;
        assert!(matches!(result, Err(ClientError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_forward_log_swallows_failures() {
        let config = ClientConfig::new("http://127.0.0.1:1").with_timeout(Duration::from_millis(200));
        let client = CoordinatorClient::new(config).unwrap();

        // Must not panic or error out
        client.forward_log("[ts] unreachable").await;
    }
}
