//! Reconnect policy
//!
//! Delay grows linearly with the attempt number and is capped, which bounds the
//! worst-case time to recover once the cache comes back.

use std::time::Duration;

const DEFAULT_BASE: Duration = Duration::from_millis(50);
const DEFAULT_CAP: Duration = Duration::from_millis(2000);
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Outcome of consulting the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Wait this long, then try again
    Wait(Duration),
    /// Stop retrying
    Permanent,
}

/// Linear, capped reconnect policy with a fixed attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE,
            cap: DEFAULT_CAP,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Policy with the default 50ms step, 2s cap and 10 attempts
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-attempt delay step
    #[must_use]
    pub fn base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    /// Set the delay cap
    #[must_use]
    pub fn cap(mut self, cap: Duration) -> Self {
        self.cap = cap;
        self
    }

    /// Set the number of attempts allowed before giving up
    #[must_use]
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt budget
    pub fn attempt_budget(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `attempt` (1-based)
    ///
    /// `attempt` 0 is treated as 1.
    pub fn next_delay(&self, attempt: u32) -> Backoff {
        let attempt = attempt.max(1);
        if attempt > self.max_attempts {
            return Backoff::Permanent;
        }
        let delay = self
            .base
            .checked_mul(attempt)
            .map_or(self.cap, |d| d.min(self.cap));
        Backoff::Wait(delay)
    }
}
