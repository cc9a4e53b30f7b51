//! Connection supervisor
//!
//! A single background task owns the connection. It is the only writer of the
//! state, the retry counter and the shared handle, and publishes all three
//! together through a `watch` channel that gates read without blocking.
//!
//! ```text
//! Idle ──start──▶ Connecting ──ok──▶ Ready
//!                   ▲   │               │ lost / health check failed
//!             delay │   │ error         ▼
//!                   └─ Reconnecting ◀───┘
//!                         │ budget exhausted
//!                         ▼
//!                       Failed            (any) ──shutdown──▶ Closed
//! ```

mod connector;
mod observer;

pub use connector::{Connector, Link, TcpConnector};
pub use observer::{LifecycleEvent, LifecycleObserver};

use crate::config::ConnectionConfig;
use crate::connection::{CacheConnection, ConnectionState};
use crate::gate::{CacheGate, Snapshot};
use crate::metrics::{counters, gauges};
use crate::policy::{Backoff, ReconnectPolicy};
use crate::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Builder for a [`Supervisor`]
pub struct SupervisorBuilder<K: Connector> {
    config: ConnectionConfig,
    connector: K,
    policy: ReconnectPolicy,
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl<K: Connector> SupervisorBuilder<K> {
    /// Override the reconnect policy
    pub fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register a lifecycle observer
    pub fn observer(mut self, observer: impl LifecycleObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Start the supervisor task on the current Tokio runtime
    pub fn spawn(self) -> SupervisorHandle<K::Link> {
        let (tx, rx) = watch::channel(Snapshot::new(ConnectionState::Idle, 0, None));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let gate = CacheGate::new(rx);

        let span = tracing::info_span!(
            "cache_supervisor",
            host = %self.config.host(),
            port = self.config.port(),
            database = self.config.database()
        );
        let supervisor = Supervisor {
            config: self.config,
            connector: self.connector,
            policy: self.policy,
            observers: self.observers,
            state: ConnectionState::Idle,
            retry_count: 0,
            link: None,
            last_error: None,
            tx,
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(supervisor.run().instrument(span));

        SupervisorHandle {
            gate,
            shutdown: shutdown_tx,
            task: Some(task),
        }
    }
}

/// Owner of the shared cache connection
pub struct Supervisor<K: Connector> {
    config: ConnectionConfig,
    connector: K,
    policy: ReconnectPolicy,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    state: ConnectionState,
    retry_count: u32,
    link: Option<Arc<K::Link>>,
    last_error: Option<String>,
    tx: watch::Sender<Snapshot<K::Link>>,
    shutdown: watch::Receiver<bool>,
}

impl<K: Connector> Supervisor<K> {
    /// Create a builder
    pub fn builder(config: ConnectionConfig, connector: K) -> SupervisorBuilder<K> {
        SupervisorBuilder {
            config,
            connector,
            policy: ReconnectPolicy::default(),
            observers: Vec::new(),
        }
    }

    /// Start supervising with the default policy and no observers
    pub fn spawn(config: ConnectionConfig, connector: K) -> SupervisorHandle<K::Link> {
        Self::builder(config, connector).spawn()
    }

    async fn run(mut self) {
        self.enter(ConnectionState::Connecting);

        loop {
            if self.state.is_terminal() {
                wait_for_shutdown(&mut self.shutdown).await;
                break;
            }
            let stop = match self.state {
                ConnectionState::Connecting => self.connect_once().await,
                ConnectionState::Ready => self.watch_ready().await,
                ConnectionState::Reconnecting => self.back_off().await,
                ConnectionState::Idle | ConnectionState::Failed | ConnectionState::Closed => true,
            };
            if stop {
                break;
            }
        }

        self.close().await;
    }

    /// One connect attempt. Returns true if shutdown was requested.
    async fn connect_once(&mut self) -> bool {
        let attempt = self.retry_count + 1;
        self.emit(LifecycleEvent::Connecting { attempt });
        tracing::info!(attempt, "connecting to cache");

        let started = Instant::now();
        let outcome = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut self.shutdown) => return true,
            outcome = self.connector.connect(&self.config) => outcome,
        };
        counters::connect_attempt(outcome.as_ref().err(), started.elapsed());

        match outcome {
            Ok(link) => {
                self.retry_count = 0;
                self.last_error = None;
                self.link = Some(Arc::new(link));
                self.enter(ConnectionState::Ready);
                tracing::info!("cache connection ready");
                self.emit(LifecycleEvent::Ready { retry_count: 0 });
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "cache connect attempt failed");
                self.begin_retry(e.to_string());
            }
        }
        false
    }

    /// Stay in `Ready` until the link is lost. Returns true if shutdown was requested.
    async fn watch_ready(&mut self) -> bool {
        let Some(link) = self.link.clone() else {
            self.begin_retry("connection handle missing".to_string());
            return false;
        };
        let interval = self.config.health_check_interval();
        let probe_timeout = self.config.connect_timeout();

        let reason = loop {
            // The health check races shutdown and loss for its whole duration.
            let check = async {
                health_tick(interval).await;
                tokio::time::timeout(probe_timeout, link.health_check()).await
            };
            let lost = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut self.shutdown) => return true,
                _ = link.lost() => Some("connection lost".to_string()),
                outcome = check => match outcome {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(format!("health check failed: {}", e)),
                    Err(_) => Some(format!("health check timed out after {:?}", probe_timeout)),
                },
            };
            if let Some(reason) = lost {
                break reason;
            }
            tracing::trace!("health check ok");
        };

        tracing::warn!(reason = %reason, "cache connection dropped");
        self.begin_retry(reason);
        link.close().await;
        false
    }

    /// Wait out the policy delay, or give up. Returns true if shutdown was requested.
    async fn back_off(&mut self) -> bool {
        match self.policy.next_delay(self.retry_count) {
            Backoff::Wait(delay) => {
                tracing::warn!(
                    retry_count = self.retry_count,
                    delay_ms = delay.as_millis() as u64,
                    "reconnecting to cache"
                );
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut self.shutdown) => return true,
                    _ = tokio::time::sleep(delay) => {}
                }
                self.enter(ConnectionState::Connecting);
            }
            Backoff::Permanent => {
                self.enter(ConnectionState::Failed);
                let failure = Error::PermanentFailure {
                    attempts: self.retry_count,
                };
                tracing::error!(
                    error = %failure,
                    budget = self.policy.attempt_budget(),
                    last_error = self.last_error.as_deref().unwrap_or("none"),
                    "continuing without cache"
                );
                self.emit(LifecycleEvent::Failed {
                    retry_count: self.retry_count,
                });
            }
        }
        false
    }

    /// Leave `Connecting` or `Ready` for `Reconnecting`, invalidating any handle first
    fn begin_retry(&mut self, reason: String) {
        self.link = None;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(reason.clone());
        self.enter(ConnectionState::Reconnecting);
        self.emit(LifecycleEvent::Reconnecting {
            retry_count: self.retry_count,
            reason,
        });
    }

    async fn close(&mut self) {
        // Unpublish before closing so no caller picks up a closing handle.
        let link = self.link.take();
        if self.state != ConnectionState::Closed {
            self.enter(ConnectionState::Closed);
        }
        if let Some(link) = link {
            link.close().await;
        }
        tracing::info!("cache supervisor stopped");
        self.emit(LifecycleEvent::Closed);
    }

    /// Apply a transition and publish the new snapshot
    fn enter(&mut self, next: ConnectionState) {
        let from = self.state;
        if let Err(e) = self.state.transition(next) {
            tracing::error!(error = %e, "rejected cache state transition");
            return;
        }
        let handle = match next {
            ConnectionState::Ready => self.link.clone(),
            _ => None,
        };
        self.tx
            .send_replace(Snapshot::new(next, self.retry_count, handle));
        tracing::debug!(from = %from, to = %next, retry_count = self.retry_count, "cache state changed");
        counters::state_transition(from, next);
        gauges::connection_state(next, self.retry_count);
    }

    fn emit(&self, event: LifecycleEvent) {
        for observer in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))).is_err() {
                tracing::error!(event = event.name(), "lifecycle observer panicked");
            }
        }
    }
}

/// Handle to a running supervisor
///
/// Dropping the handle stops the supervisor as if [`shutdown`](Self::shutdown)
/// had been called, without waiting for it.
pub struct SupervisorHandle<L = CacheConnection> {
    gate: CacheGate<L>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<L: Link> SupervisorHandle<L> {
    /// A handle with no supervisor behind it; its gate is permanently unavailable
    pub fn degraded() -> Self {
        let (shutdown, _) = watch::channel(true);
        Self {
            gate: CacheGate::degraded(),
            shutdown,
            task: None,
        }
    }

    /// Gate for cache consumers
    pub fn gate(&self) -> CacheGate<L> {
        self.gate.clone()
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        self.gate.state()
    }

    /// Stop the supervisor, cancel any pending retry and close the connection
    pub async fn shutdown(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "cache supervisor task ended abnormally");
            }
        }
    }
}

impl<L> std::fmt::Debug for SupervisorHandle<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("gate", &self.gate)
            .field("running", &self.task.as_ref().is_some_and(|t| !t.is_finished()))
            .finish()
    }
}

/// Resolves once shutdown is requested or the handle is gone
async fn wait_for_shutdown(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn health_tick(interval: Option<Duration>) {
    match interval {
        Some(interval) => tokio::time::sleep(interval).await,
        None => std::future::pending().await,
    }
}
