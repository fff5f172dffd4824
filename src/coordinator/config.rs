//! Coordinator configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::coordinator::authority::DEFAULT_WORLD_TIME_URL;
use crate::coordinator::launcher::DEFAULT_LAUNCH_COMMAND;

/// Configuration for the coordinator process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// World-clock service URL used as the synchronization reference
    pub authority_url: String,

    /// Timeout for every outbound call (authority, polls, pushes), seconds
    pub request_timeout_secs: u64,

    /// Launch command template; `{host}` and `{port}` are substituted
    pub launch_command: String,

    /// Lowest port assigned to launched nodes
    pub launch_port_min: u16,

    /// Highest port assigned to launched nodes
    pub launch_port_max: u16,

    /// Per-observer event buffer capacity
    pub bus_capacity: usize,

    /// Enable CORS for the API
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".parse().unwrap(),
            authority_url: DEFAULT_WORLD_TIME_URL.to_string(),
            request_timeout_secs: 5,
            launch_command: DEFAULT_LAUNCH_COMMAND.to_string(),
            launch_port_min: 5000,
            launch_port_max: 6000,
            bus_capacity: 256,
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl CoordinatorConfig {
    /// Create a new config builder
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_secs".to_string(),
                reason: "Timeout must be at least 1 second".to_string(),
            });
        }

        if self.launch_port_min > self.launch_port_max {
            return Err(ConfigError::InvalidValue {
                field: "launch_port_min".to_string(),
                reason: "Port range is inverted".to_string(),
            });
        }

        if self.bus_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bus_capacity".to_string(),
                reason: "Must buffer at least 1 event".to_string(),
            });
        }

        if url::Url::parse(&self.authority_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "authority_url".to_string(),
                reason: format!("Invalid URL: {}", self.authority_url),
            });
        }

        Ok(())
    }
}

/// Builder for CoordinatorConfig
#[derive(Debug, Default)]
pub struct CoordinatorConfigBuilder {
    bind_address: Option<SocketAddr>,
    authority_url: Option<String>,
    request_timeout_secs: Option<u64>,
    launch_command: Option<String>,
    launch_port_min: Option<u16>,
    launch_port_max: Option<u16>,
    bus_capacity: Option<usize>,
    enable_cors: Option<bool>,
    enable_request_logging: Option<bool>,
}

impl CoordinatorConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_address = Some(addr.parse().map_err(|_| ConfigError::InvalidValue {
            field: "bind_address".to_string(),
            reason: format!("Invalid address: {}", addr),
        })?);
        Ok(self)
    }

    /// Set the world-clock service URL
    pub fn authority_url(mut self, url: impl Into<String>) -> Self {
        self.authority_url = Some(url.into());
        self
    }

    /// Set outbound request timeout
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Set the launch command template
    pub fn launch_command(mut self, command: impl Into<String>) -> Self {
        self.launch_command = Some(command.into());
        self
    }

    /// Set the launch port range
    pub fn launch_port_range(mut self, min: u16, max: u16) -> Self {
        self.launch_port_min = Some(min);
        self.launch_port_max = Some(max);
        self
    }

    /// Set the per-observer event buffer capacity
    pub fn bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = Some(capacity);
        self
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<CoordinatorConfig, ConfigError> {
        let defaults = CoordinatorConfig::default();
        let config = CoordinatorConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            authority_url: self.authority_url.unwrap_or(defaults.authority_url),
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            launch_command: self.launch_command.unwrap_or(defaults.launch_command),
            launch_port_min: self.launch_port_min.unwrap_or(defaults.launch_port_min),
            launch_port_max: self.launch_port_max.unwrap_or(defaults.launch_port_max),
            bus_capacity: self.bus_capacity.unwrap_or(defaults.bus_capacity),
            enable_cors: self.enable_cors.unwrap_or(defaults.enable_cors),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue { field: String, reason: String },
    MissingField { field: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            Self::MissingField { field } => {
                write!(f, "Missing required field: {}", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address.port(), 4000);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_config_builder() {
        let config = CoordinatorConfig::builder()
            .request_timeout_secs(10)
            .launch_port_range(7000, 7100)
            .enable_cors(false)
            .build()
            .unwrap();

        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.launch_port_min, 7000);
        assert_eq!(config.launch_port_max, 7100);
        assert!(!config.enable_cors);
    }

    #[test]
    fn test_config_validation_rejects_inverted_port_range() {
        let result = CoordinatorConfig::builder()
            .launch_port_range(6000, 5000)
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_rejects_bad_authority_url() {
        let result = CoordinatorConfig::builder()
            .authority_url("not a url")
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_config_builder_with_address() {
        let config = CoordinatorConfig::builder()
            .bind_address_str("127.0.0.1:9000")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(config.bind_address.port(), 9000);
    }
}
