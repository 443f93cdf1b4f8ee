//! Configuration management for the converter worker
//!
//! Configuration is loaded from a TOML file or from `CONVERTER_*` environment
//! variables, and command-line flags are layered on top by the binary.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::{Node, NodeParseError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Intake server configuration
    pub server: ServerConfig,

    /// Coordinator discovery and reporting
    pub coordinator: CoordinatorConfig,

    /// Job execution
    pub worker: WorkerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Intake HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the intake endpoint listens on
    pub bind_address: SocketAddr,

    /// Enable per-request tracing
    pub enable_request_logging: bool,
}

/// Coordinator node directory and client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Candidate coordinator nodes, tried round-robin during registration
    pub nodes: Vec<Node>,

    /// Timeout for a single registration request in seconds
    pub register_timeout_secs: u64,

    /// Timeout for a status report in seconds
    pub report_timeout_secs: u64,
}

/// Job execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Directory where source and converted files are written
    pub work_dir: PathBuf,

    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: PathBuf,

    /// Maximum number of pipelines executing at once
    pub max_concurrent_jobs: usize,

    /// How long shutdown waits for in-flight jobs, in seconds
    pub drain_timeout_secs: u64,

    /// Optional limit on the source download, in seconds
    pub download_timeout_secs: Option<u64>,

    /// Optional limit on the ffmpeg run, in seconds
    pub convert_timeout_secs: Option<u64>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_request_logging: true,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            register_timeout_secs: 10,
            report_timeout_secs: 5,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/audio"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            max_concurrent_jobs: 4,
            drain_timeout_secs: 30,
            download_timeout_secs: None,
            convert_timeout_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `CONVERTER_NODES`: comma separated `host:port` list of coordinator nodes
    /// - `CONVERTER_BIND`: intake listen address [default: 0.0.0.0:8080]
    /// - `CONVERTER_WORK_DIR`: work directory [default: /audio]
    /// - `CONVERTER_FFMPEG`: ffmpeg binary [default: ffmpeg]
    /// - `CONVERTER_MAX_JOBS`: concurrent pipelines [default: 4]
    /// - `CONVERTER_DRAIN_TIMEOUT`: shutdown drain in seconds [default: 30]
    /// - `CONVERTER_REPORT_TIMEOUT`: status report timeout in seconds [default: 5]
    /// - `CONVERTER_REGISTER_TIMEOUT`: registration timeout in seconds [default: 10]
    /// - `CONVERTER_DOWNLOAD_TIMEOUT`: download limit in seconds [optional]
    /// - `CONVERTER_CONVERT_TIMEOUT`: ffmpeg limit in seconds [optional]
    /// - `CONVERTER_LOG_LEVEL` / `CONVERTER_LOG_FORMAT`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(nodes) = std::env::var("CONVERTER_NODES") {
            config.coordinator.nodes = parse_node_list(&nodes)?;
        }

        if let Ok(bind) = std::env::var("CONVERTER_BIND") {
            config.server.bind_address =
                bind.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "CONVERTER_BIND".to_string(),
                    reason: format!("invalid socket address: {bind}"),
                })?;
        }

        if let Ok(dir) = std::env::var("CONVERTER_WORK_DIR") {
            config.worker.work_dir = PathBuf::from(dir);
        }

        if let Ok(ffmpeg) = std::env::var("CONVERTER_FFMPEG") {
            config.worker.ffmpeg_path = PathBuf::from(ffmpeg);
        }

        config.worker.max_concurrent_jobs = env_parse("CONVERTER_MAX_JOBS")
            .unwrap_or(config.worker.max_concurrent_jobs);
        config.worker.drain_timeout_secs = env_parse("CONVERTER_DRAIN_TIMEOUT")
            .unwrap_or(config.worker.drain_timeout_secs);
        config.worker.download_timeout_secs = env_parse("CONVERTER_DOWNLOAD_TIMEOUT");
        config.worker.convert_timeout_secs = env_parse("CONVERTER_CONVERT_TIMEOUT");
        config.coordinator.report_timeout_secs = env_parse("CONVERTER_REPORT_TIMEOUT")
            .unwrap_or(config.coordinator.report_timeout_secs);
        config.coordinator.register_timeout_secs = env_parse("CONVERTER_REGISTER_TIMEOUT")
            .unwrap_or(config.coordinator.register_timeout_secs);

        if let Ok(level) = std::env::var("CONVERTER_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("CONVERTER_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: None,
            source: e,
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        if self.coordinator.report_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.report_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.coordinator.register_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "coordinator.register_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.worker.max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker.max_concurrent_jobs".to_string(),
                reason: "must allow at least 1 job".to_string(),
            });
        }

        if self.worker.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "worker.ffmpeg_path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Status report timeout as Duration
    #[must_use]
    pub fn report_timeout(&self) -> Duration {
        Duration::from_secs(self.coordinator.report_timeout_secs)
    }

    /// Registration timeout as Duration
    #[must_use]
    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.coordinator.register_timeout_secs)
    }

    /// Shutdown drain timeout as Duration
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.worker.drain_timeout_secs)
    }
}

impl WorkerConfig {
    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout_secs.map(Duration::from_secs)
    }

    pub fn convert_timeout(&self) -> Option<Duration> {
        self.convert_timeout_secs.map(Duration::from_secs)
    }
}

/// Parse a comma separated node list, skipping empty entries
pub fn parse_node_list(value: &str) -> Result<Vec<Node>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Node::parse(s).map_err(ConfigError::from))
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {source}")]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: toml::de::Error,
    },

    #[error("No coordinator nodes configured")]
    NoNodes,

    #[error(transparent)]
    InvalidNode(#[from] NodeParseError),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_nodes() -> Config {
        let mut config = Config::default();
        config.coordinator.nodes = vec![Node::parse("127.0.0.1:9000").unwrap()];
        config
    }

    #[test]
    fn test_default_requires_nodes() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoNodes)));
        assert!(config_with_nodes().validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.report_timeout(), Duration::from_secs(5));
        assert_eq!(config.worker.work_dir, PathBuf::from("/audio"));
        assert_eq!(config.server.bind_address.port(), 8080);
        assert!(config.worker.download_timeout().is_none());
    }

    #[test]
    fn test_invalid_concurrency() {
        let mut config = config_with_nodes();
        config.worker.max_concurrent_jobs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            [server]
            bind_address = "127.0.0.1:9090"

            [coordinator]
            nodes = ["10.0.0.1:8000", "10.0.0.2:8000"]

            [worker]
            work_dir = "/tmp/audio"
            max_concurrent_jobs = 2
            convert_timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address.port(), 9090);
        assert_eq!(config.coordinator.nodes.len(), 2);
        assert_eq!(config.coordinator.nodes[1].address(), "10.0.0.2:8000");
        assert_eq!(config.coordinator.report_timeout_secs, 5);
        assert_eq!(config.worker.max_concurrent_jobs, 2);
        assert_eq!(config.worker.convert_timeout(), Some(Duration::from_secs(600)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_rejects_bad_node() {
        let result = Config::from_toml(
            r#"
            [coordinator]
            nodes = ["no-port"]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_parse_node_list() {
        let nodes = parse_node_list("a:1, b:2,,c:3 ").unwrap();
        let addrs: Vec<_> = nodes.iter().map(|n| n.address()).collect();
        assert_eq!(addrs, vec!["a:1", "b:2", "c:3"]);

        assert!(parse_node_list("a:1,b").is_err());
        assert!(parse_node_list("").unwrap().is_empty());
    }
}
