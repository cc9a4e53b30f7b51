//! Error types for cache-lifeline

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Connection parameters are missing or invalid
    #[error("invalid cache configuration: {field}: {reason}")]
    Config {
        /// Name of the offending field (e.g. `host`)
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// A single connect or handshake attempt failed
    #[error("connect attempt failed: {0}")]
    Connect(String),

    /// The cache is not usable right now
    #[error("cache unavailable")]
    Unavailable,

    /// The connection died while an operation was in flight
    #[error("cache connection lost")]
    ConnectionLost,

    /// Retry budget exhausted; the cache stays down for the process lifetime
    #[error("cache permanently unavailable after {attempts} attempts")]
    PermanentFailure {
        /// Number of failed attempts before giving up
        attempts: u32,
    },

    /// Error reported by the Redis client (transport failure or error reply)
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The cache answered with something other than what was asked for
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// Invalid state transition
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },
}

impl Error {
    /// Build a configuration error for `field`
    pub fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Error::Config {
            field,
            reason: reason.into(),
        }
    }

    /// True for the outcomes callers must treat as "no cache"
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable | Error::ConnectionLost)
    }

    /// True if this error means the underlying socket can no longer be used
    ///
    /// Error replies such as `WRONGTYPE` leave the connection usable.
    pub fn is_fatal_to_connection(&self) -> bool {
        match self {
            Error::Redis(e) => e.is_io_error() || e.is_connection_dropped() || e.is_timeout(),
            _ => false,
        }
    }

    /// Short label for the `error` dimension of connect metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config",
            Error::Connect(_) => "connect",
            Error::Unavailable => "unavailable",
            Error::ConnectionLost => "connection_lost",
            Error::PermanentFailure { .. } => "permanent_failure",
            Error::Redis(e) if e.kind() == redis::ErrorKind::AuthenticationFailed => "auth",
            Error::Redis(e) if self.is_fatal_to_connection() || e.is_connection_refusal() => "io",
            Error::Redis(_) => "server",
            Error::UnexpectedReply(_) => "unexpected_reply",
            Error::InvalidState { .. } => "invalid_state",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
