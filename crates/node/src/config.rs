//! Node configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::NodeError;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PRICE_TIMEOUT_MS: u64 = 30_000;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(NodeError::InvalidSetting {
                key: "LOG_FORMAT",
                value: s.to_string(),
            }),
        }
    }
}

/// Node configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `PRICE_TIMEOUT_MS`: bound on one price lookup (default: `30000`)
/// - `METRICS_ADDR`: Prometheus listen address; unset disables the exporter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub log_level: String,
    pub log_format: LogFormat,
    pub price_timeout: Duration,
    pub metrics_addr: Option<SocketAddr>,
}

impl NodeConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, NodeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the raw value of
    /// a variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, NodeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        let price_timeout = match lookup("PRICE_TIMEOUT_MS") {
            Some(value) => Duration::from_millis(parse("PRICE_TIMEOUT_MS", &value)?),
            None => Duration::from_millis(DEFAULT_PRICE_TIMEOUT_MS),
        };

        let metrics_addr = lookup("METRICS_ADDR")
            .map(|value| parse("METRICS_ADDR", &value))
            .transpose()?;

        Ok(Self {
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
            price_timeout,
            metrics_addr,
        })
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Text,
            price_timeout: Duration::from_millis(DEFAULT_PRICE_TIMEOUT_MS),
            metrics_addr: None,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, NodeError> {
    value.trim().parse().map_err(|_| NodeError::InvalidSetting {
        key,
        value: value.to_string(),
    })
}
