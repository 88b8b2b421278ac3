//! Node error types.

use saga::SagaError;
use thiserror::Error;

/// Errors raised while configuring or running the node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// An environment setting could not be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidSetting { key: &'static str, value: String },

    /// `start` was called on a running node.
    #[error("Node is already running")]
    AlreadyRunning,

    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    /// The coordinator task panicked or was aborted.
    #[error("Coordinator task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Failed to install tracing subscriber: {0}")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    #[error("Failed to install Prometheus exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}
