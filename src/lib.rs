//! cache-lifeline: a supervised, self-healing connection to a shared
//! Redis-compatible cache.
//!
//! One background task owns the connection, reconnects with a linear capped
//! backoff, and gives up after a fixed budget. The rest of the service sees
//! the cache only through a [`CacheGate`], where "no cache" is an ordinary
//! `Err(Error::Unavailable)` rather than a crash or a hang.
//!
//! # Example
//!
//! ```no_run
//! # async fn example() {
//! use cache_lifeline::connection::CacheConnection;
//!
//! let supervisor = cache_lifeline::start_from_env();
//! let gate = supervisor.gate();
//!
//! let cached = gate
//!     .with_connection(|conn: std::sync::Arc<CacheConnection>| async move {
//!         let greeting: Option<String> = conn.query(redis::cmd("GET").arg("greeting")).await?;
//!         Ok(greeting)
//!     })
//!     .await;
//!
//! match cached {
//!     Ok(reply) => println!("cache hit: {:?}", reply),
//!     Err(e) if e.is_unavailable() => println!("no cache, computing instead"),
//!     Err(e) => println!("cache error: {}", e),
//! }
//!
//! supervisor.shutdown().await;
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod policy;
pub mod supervisor;

pub use config::{ConnectionConfig, RawConfig};
pub use connection::{CacheConnection, ConnectionState};
pub use error::{Error, Result};
pub use gate::CacheGate;
pub use policy::{Backoff, ReconnectPolicy};
pub use supervisor::{
    Connector, LifecycleEvent, LifecycleObserver, Link, Supervisor, SupervisorHandle,
    TcpConnector,
};

/// Validate `REDIS_*` environment variables and start supervising
///
/// Must be called from within a Tokio runtime. An invalid configuration is
/// logged once and yields a permanently degraded handle; no connection is
/// attempted.
pub fn start_from_env() -> SupervisorHandle<CacheConnection> {
    start(&RawConfig::from_env())
}

/// Validate `raw` and start supervising a TCP connection
///
/// See [`start_from_env`].
pub fn start(raw: &RawConfig) -> SupervisorHandle<CacheConnection> {
    start_with(raw, TcpConnector)
}

/// Validate `raw` and start supervising connections opened by `connector`
///
/// The connector is never called when the configuration is invalid.
pub fn start_with<K: Connector>(raw: &RawConfig, connector: K) -> SupervisorHandle<K::Link> {
    match raw.validate() {
        Ok(config) => Supervisor::spawn(config, connector),
        Err(e) => {
            report_config_error(&e);
            SupervisorHandle::degraded()
        }
    }
}

fn report_config_error(error: &Error) {
    if let Error::Config { field, .. } = error {
        crate::metrics::counters::config_error(*field);
    }
    tracing::error!(
        target: "cache_lifeline::config",
        error = %error,
        "cache is not configured; running without cache"
    );
}
