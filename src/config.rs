//! Configuration for the bridge server.
//!
//! Supports YAML file and environment variable overrides.

use serde::Deserialize;
use std::path::Path;

/// Default listening port, 0xECD.
pub const DEFAULT_PORT: u16 = 3789;

/// Default per-queue message bound.
pub const DEFAULT_QUEUE_DEPTH: usize = 4096;

/// Environment variable naming the listening port.
pub const PORT_ENV: &str = "COSIM_PORT";

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Host to bind the client listener to.
    pub host: String,
    /// Port for the client listener. 0 selects an ephemeral port.
    pub port: u16,
    /// Maximum number of messages held per endpoint queue.
    pub max_queue_depth: usize,
    /// Endpoints to pre-register (standalone server only; a simulator
    /// registers its endpoints through the entry points instead).
    pub endpoints: Vec<EndpointConfig>,
}

/// One pre-registered endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint identifier.
    pub id: u32,
    /// Simulator-to-client type id.
    pub send_type_id: i64,
    /// Simulator-to-client declared type size.
    pub send_type_size: i32,
    /// Client-to-simulator type id.
    pub recv_type_id: i64,
    /// Client-to-simulator declared type size.
    pub recv_type_size: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            max_queue_depth: DEFAULT_QUEUE_DEPTH,
            endpoints: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file named by `COSIM_CONFIG` (default `cosim.yaml`)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("COSIM_CONFIG").unwrap_or_else(|_| "cosim.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("COSIM_HOST") {
            self.host = host;
        }

        if let Ok(port) = std::env::var(PORT_ENV) {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(depth) = std::env::var("COSIM_QUEUE_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.max_queue_depth = d;
            }
        }
    }

    /// The socket address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.max_queue_depth, DEFAULT_QUEUE_DEPTH);
        assert!(config.endpoints.is_empty());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
host: 127.0.0.1
port: 4100
max_queue_depth: 64

endpoints:
  - id: 1
    send_type_id: 0x10
    send_type_size: 8
    recv_type_id: 0x20
    recv_type_size: 4
  - id: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 4100);
        assert_eq!(config.max_queue_depth, 64);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[0].send_type_id, 0x10);
        assert_eq!(config.endpoints[1].id, 2);
        assert_eq!(config.endpoints[1].send_type_size, 0);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("port: 5000\n").unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.max_queue_depth, DEFAULT_QUEUE_DEPTH);
    }

    #[test]
    fn test_bind_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9999,
            ..Config::default()
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9999");
    }
}
