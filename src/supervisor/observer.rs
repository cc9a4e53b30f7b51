//! Lifecycle notifications
//!
//! Observers are for diagnostics. The supervisor never consults them for
//! control decisions and a panicking observer is contained.

use std::fmt;

/// Lifecycle event emitted on each state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// A connect attempt is starting (`attempt` is 1-based within the outage)
    Connecting {
        /// Attempt number
        attempt: u32,
    },
    /// Connection established
    Ready {
        /// Retry counter after the reset (always 0)
        retry_count: u32,
    },
    /// Connection failed or was lost; a retry is pending
    Reconnecting {
        /// Retry counter after the increment
        retry_count: u32,
        /// Why the previous attempt or connection ended
        reason: String,
    },
    /// Retry budget exhausted
    Failed {
        /// Retry counter at the time of giving up
        retry_count: u32,
    },
    /// Supervisor shut down
    Closed,
}

impl LifecycleEvent {
    /// Short name, matching the state entered
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::Connecting { .. } => "connecting",
            LifecycleEvent::Ready { .. } => "ready",
            LifecycleEvent::Reconnecting { .. } => "reconnecting",
            LifecycleEvent::Failed { .. } => "failed",
            LifecycleEvent::Closed => "closed",
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Connecting { attempt } => write!(f, "connecting (attempt {})", attempt),
            LifecycleEvent::Ready { .. } => write!(f, "ready"),
            LifecycleEvent::Reconnecting {
                retry_count,
                reason,
            } => write!(f, "reconnecting (retry {}): {}", retry_count, reason),
            LifecycleEvent::Failed { retry_count } => {
                write!(f, "failed after {} retries", retry_count)
            }
            LifecycleEvent::Closed => write!(f, "closed"),
        }
    }
}

/// Receives lifecycle events
pub trait LifecycleObserver: Send + Sync {
    /// Called on the supervisor task; keep it short
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event)
    }
}
