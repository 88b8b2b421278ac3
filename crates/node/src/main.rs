//! Shop node entry point.

use metrics_exporter_prometheus::PrometheusBuilder;
use node::{LogFormat, NodeConfig, NodeError, ShopNode};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing(config: &NodeConfig) -> Result<(), NodeError> {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let (json, text) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json()), None),
        LogFormat::Text => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .try_init()?;
    Ok(())
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), NodeError> {
    // 1. Load configuration and initialize tracing
    let config = NodeConfig::from_env()?;
    init_tracing(&config)?;

    // 2. Serve Prometheus metrics when an address is configured
    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        tracing::info!(%addr, "serving Prometheus metrics");
    }

    // 3. Start the node and run until signalled
    let mut node = ShopNode::new(&config);
    node.start().await?;
    tracing::info!(
        price_timeout_ms = config.price_timeout.as_millis() as u64,
        "shop node running"
    );

    shutdown_signal().await;

    node.stop().await?;
    tracing::info!("shop node shut down gracefully");
    Ok(())
}
