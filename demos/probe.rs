//! Supervise the cache configured in the environment and log its lifecycle
//!
//! Run with:
//! REDIS_HOST=localhost REDIS_PORT=6379 RUST_LOG=cache_lifeline=debug cargo run --example probe

use cache_lifeline::{LifecycleEvent, RawConfig, Supervisor};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match RawConfig::from_env().validate() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "cache not configured");
            return;
        }
    };

    let handle = Supervisor::builder(config, cache_lifeline::TcpConnector)
        .observer(|event: &LifecycleEvent| tracing::info!(event = %event, "lifecycle"))
        .spawn();
    let gate = handle.gate();

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let outcome = gate.with_connection(|conn| async move { conn.ping().await }).await;
                match outcome {
                    Ok(()) => tracing::info!(state = %gate.state(), "ping ok"),
                    Err(e) => tracing::info!(state = %gate.state(), error = %e, "ping skipped"),
                }
            }
        }
    }

    handle.shutdown().await;
}
