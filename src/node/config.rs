//! Node configuration
//!
//! Environment-based configuration for time nodes, with a builder for
//! programmatic construction.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for a time node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Host under which this node announces itself to the coordinator
    pub advertised_host: String,

    /// Coordinator base URL
    pub coordinator_url: String,

    /// Forward journal lines to the coordinator's log ingestion endpoint
    pub forward_logs: bool,

    /// Bound of the one-time startup skew, seconds (drawn from ±range)
    pub skew_range_secs: i64,

    /// Timeout for outbound calls to the coordinator, seconds
    pub timeout_secs: u64,
}

impl NodeConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `NODE_PORT`: Port to bind the node service on [default: 3000]
    /// - `ADVERTISED_HOST`: Host announced at registration [default: localhost]
    /// - `COORDINATOR_URL`: Coordinator base URL [default: http://localhost:4000]
    /// - `FORWARD_LOGS`: Forward journal lines to the coordinator [default: true]
    /// - `SKEW_RANGE_SECS`: Startup skew bound in seconds [default: 60]
    /// - `TIMEOUT_SECS`: Outbound request timeout [default: 5]
    pub fn from_env() -> Result<Self, ConfigError> {
        let port: u16 = env::var("NODE_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let config = Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], port)),
            advertised_host: env::var("ADVERTISED_HOST").unwrap_or_else(|_| "localhost".to_string()),
            coordinator_url: env::var("COORDINATOR_URL")
                .unwrap_or_else(|_| "http://localhost:4000".to_string()),
            forward_logs: env::var("FORWARD_LOGS")
                .ok()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(true),
            skew_range_secs: env::var("SKEW_RANGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            timeout_secs: env::var("TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration with builder pattern
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Get outbound request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Port this node announces at registration
    pub fn advertised_port(&self) -> u16 {
        self.bind_address.port()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.advertised_host.is_empty() {
            return Err(ConfigError::InvalidValue(
                "advertised_host".to_string(),
                "Host cannot be empty".to_string(),
            ));
        }

        if url::Url::parse(&self.coordinator_url).is_err() {
            return Err(ConfigError::InvalidValue(
                "coordinator_url".to_string(),
                format!("Invalid URL: {}", self.coordinator_url),
            ));
        }

        if self.skew_range_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "skew_range_secs".to_string(),
                "Must be non-negative".to_string(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_secs".to_string(),
                "Timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }

    /// Display configuration
    pub fn display(&self) -> String {
        format!(
            "Node Configuration\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Advertised Host: {}\n\
             Coordinator: {}\n\
             Forward Logs: {}\n\
             Skew Range: ±{}s\n\
             Timeout: {}s",
            "",
            self.bind_address,
            self.advertised_host,
            self.coordinator_url,
            self.forward_logs,
            self.skew_range_secs,
            self.timeout_secs,
        )
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".parse().unwrap(),
            advertised_host: "localhost".to_string(),
            coordinator_url: "http://localhost:4000".to_string(),
            forward_logs: true,
            skew_range_secs: 60,
            timeout_secs: 5,
        }
    }
}

// ============================================================================
// Node Config Builder
// ============================================================================

/// Builder for NodeConfig
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    bind_address: Option<SocketAddr>,
    advertised_host: Option<String>,
    coordinator_url: Option<String>,
    forward_logs: Option<bool>,
    skew_range_secs: Option<i64>,
    timeout_secs: Option<u64>,
}

impl NodeConfigBuilder {
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.bind_address = Some(SocketAddr::from(([0, 0, 0, 0], port)));
        self
    }

    pub fn advertised_host(mut self, host: impl Into<String>) -> Self {
        self.advertised_host = Some(host.into());
        self
    }

    pub fn coordinator_url(mut self, url: impl Into<String>) -> Self {
        self.coordinator_url = Some(url.into());
        self
    }

    pub fn forward_logs(mut self, forward: bool) -> Self {
        self.forward_logs = Some(forward);
        self
    }

    pub fn skew_range_secs(mut self, range: i64) -> Self {
        self.skew_range_secs = Some(range);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<NodeConfig, ConfigError> {
        let defaults = NodeConfig::default();
        let config = NodeConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            advertised_host: self.advertised_host.unwrap_or(defaults.advertised_host),
            coordinator_url: self.coordinator_url.unwrap_or(defaults.coordinator_url),
            forward_logs: self.forward_logs.unwrap_or(defaults.forward_logs),
            skew_range_secs: self.skew_range_secs.unwrap_or(defaults.skew_range_secs),
            timeout_secs: self.timeout_secs.unwrap_or(defaults.timeout_secs),
        };

        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Invalid value
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue(field, msg) => write!(f, "Invalid value for {field}: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_config_default() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.advertised_port(), 3000);
        assert_eq!(config.skew_range_secs, 60);
        assert!(config.forward_logs);
    }

    #[test]
    fn test_node_config_builder() {
        let config = NodeConfig::builder()
            .port(3005)
            .advertised_host("10.0.0.7")
            .coordinator_url("http://coordinator:4000")
            .skew_range_secs(10)
            .build()
            .unwrap();

        assert_eq!(config.advertised_port(), 3005);
        assert_eq!(config.advertised_host, "10.0.0.7");
        assert_eq!(config.skew_range_secs, 10);
    }

    #[test]
    fn test_node_config_rejects_bad_coordinator_url() {
        let result = NodeConfig::builder().coordinator_url("not a url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_node_config_rejects_negative_skew_range() {
        let result = NodeConfig::builder().skew_range_secs(-1).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_node_config_display() {
        let config = NodeConfig::default();
        let display = config.display();

        assert!(display.contains("Advertised Host: localhost"));
        assert!(display.contains("Skew Range: ±60s"));
    }
}
