//! Cache availability gate
//!
//! The gate is the only way the rest of the service touches the cache. It
//! answers "is the cache usable right now" from the latest snapshot the
//! supervisor published, without waiting, and runs operations only when the
//! answer is yes. A missing cache is an ordinary `Err(Error::Unavailable)`,
//! which callers handle by falling back to their no-cache path.

use crate::connection::{CacheConnection, ConnectionState};
use crate::metrics::{counters, labels};
use crate::supervisor::Link;
use crate::{Error, Result};
use futures::Stream;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// What the supervisor publishes on every transition
pub(crate) struct Snapshot<L> {
    pub(crate) state: ConnectionState,
    pub(crate) retry_count: u32,
    pub(crate) handle: Option<Arc<L>>,
}

impl<L> Snapshot<L> {
    pub(crate) fn new(state: ConnectionState, retry_count: u32, handle: Option<Arc<L>>) -> Self {
        Self {
            state,
            retry_count,
            handle,
        }
    }
}

/// Read-only view of the supervised connection
pub struct CacheGate<L = CacheConnection> {
    rx: watch::Receiver<Snapshot<L>>,
}

impl<L> Clone for CacheGate<L> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<L> std::fmt::Debug for CacheGate<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.rx.borrow();
        f.debug_struct("CacheGate")
            .field("state", &snapshot.state)
            .field("retry_count", &snapshot.retry_count)
            .finish()
    }
}

impl<L: Link> CacheGate<L> {
    pub(crate) fn new(rx: watch::Receiver<Snapshot<L>>) -> Self {
        Self { rx }
    }

    /// A gate that is permanently unavailable
    ///
    /// Used when the configuration is invalid and no supervisor runs.
    pub fn degraded() -> Self {
        let (_tx, rx) = watch::channel(Snapshot::new(ConnectionState::Failed, 0, None));
        Self { rx }
    }

    /// Current supervisor state
    pub fn state(&self) -> ConnectionState {
        self.rx.borrow().state
    }

    /// Current retry counter
    pub fn retry_count(&self) -> u32 {
        self.rx.borrow().retry_count
    }

    /// True iff the cache can take operations right now
    ///
    /// Also false as soon as the current handle notices it is lost, before the
    /// supervisor has published the transition.
    pub fn is_available(&self) -> bool {
        self.current().is_some()
    }

    fn current(&self) -> Option<Arc<L>> {
        let snapshot = self.rx.borrow();
        if snapshot.state != ConnectionState::Ready {
            return None;
        }
        snapshot
            .handle
            .as_ref()
            .filter(|handle| !handle.is_lost())
            .cloned()
    }

    /// Run `op` against the live connection
    ///
    /// Returns [`Error::Unavailable`] immediately when the cache is not ready;
    /// `op` is not called in that case. If `op` fails because the connection
    /// died underneath it, the outcome is [`Error::ConnectionLost`]. Other
    /// errors from `op` are passed through.
    ///
    /// The handle passed to `op` must not be kept after `op` returns.
    pub async fn with_connection<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<L>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(handle) = self.current() else {
            counters::gate_rejection(labels::REASON_UNAVAILABLE);
            return Err(Error::Unavailable);
        };

        match op(Arc::clone(&handle)).await {
            Ok(value) => Ok(value),
            Err(e) if handle.is_lost() || e.is_fatal_to_connection() || e.is_unavailable() => {
                tracing::debug!(error = %e, "cache operation lost its connection");
                counters::gate_rejection(labels::REASON_CONNECTION_LOST);
                Err(Error::ConnectionLost)
            }
            Err(e) => Err(e),
        }
    }

    /// Wait until the state satisfies `predicate`
    ///
    /// Returns the matching state, or the last published state if the
    /// supervisor has gone away.
    pub async fn wait_until<P>(&self, mut predicate: P) -> ConnectionState
    where
        P: FnMut(ConnectionState) -> bool,
    {
        let mut rx = self.rx.clone();
        if let Ok(snapshot) = rx.wait_for(|snapshot| predicate(snapshot.state)).await {
            return snapshot.state;
        }
        let state = rx.borrow().state;
        state
    }

    /// Stream of state changes, for diagnostics
    ///
    /// Only the latest state is kept between polls, so rapid transitions may
    /// be coalesced. The stream ends when the supervisor is gone.
    pub fn changes(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        let mut rx = self.rx.clone();
        rx.borrow_and_update();
        futures::stream::unfold(rx, |mut rx| async move {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().state;
            Some((state, rx))
        })
    }
}
