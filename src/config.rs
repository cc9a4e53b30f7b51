//! Cache connection configuration
//!
//! Configuration is read once at startup, validated, and then immutable.
//! Environment variables:
//! * `REDIS_HOST` (required)
//! * `REDIS_PORT` (required, 1..=65535)
//! * `REDIS_USER`, `REDIS_PASSWORD` (optional)
//! * `REDIS_DB` (optional, default 0)

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Environment variable holding the cache host
pub const ENV_HOST: &str = "REDIS_HOST";
/// Environment variable holding the cache port
pub const ENV_PORT: &str = "REDIS_PORT";
/// Environment variable holding the ACL username
pub const ENV_USER: &str = "REDIS_USER";
/// Environment variable holding the password
pub const ENV_PASSWORD: &str = "REDIS_PASSWORD";
/// Environment variable holding the logical database index
pub const ENV_DB: &str = "REDIS_DB";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Unvalidated configuration, as read from the environment or a config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Cache host
    pub host: Option<String>,
    /// Cache port, still textual
    pub port: Option<String>,
    /// ACL username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Logical database index, still textual
    pub database: Option<String>,
}

impl RawConfig {
    /// Read the raw configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the raw configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            host: lookup(ENV_HOST),
            port: lookup(ENV_PORT),
            username: lookup(ENV_USER),
            password: lookup(ENV_PASSWORD),
            database: lookup(ENV_DB),
        }
    }

    /// Validate into a [`ConnectionConfig`]
    ///
    /// Fails with [`Error::Config`] naming the first invalid field. Performs no I/O.
    pub fn validate(&self) -> Result<ConnectionConfig> {
        let host = match self.host.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => h.to_string(),
            Some(_) => return Err(Error::config("host", "must not be empty")),
            None => return Err(Error::config("host", "is not set")),
        };

        let port = match self.port.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => parse_port(p)?,
            _ => return Err(Error::config("port", "is not set")),
        };

        let database = match self.database.as_deref().map(str::trim) {
            Some(db) if !db.is_empty() => db.parse::<u32>().map_err(|_| {
                Error::config("database", format!("`{}` is not a non-negative integer", db))
            })?,
            _ => 0,
        };

        Ok(ConnectionConfig {
            host,
            port,
            username: non_empty(self.username.as_deref()),
            password: non_empty(self.password.as_deref()),
            database,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            health_check_interval: Some(DEFAULT_HEALTH_CHECK_INTERVAL),
        })
    }
}

fn parse_port(value: &str) -> Result<u16> {
    match value.parse::<u32>() {
        Ok(0) => Err(Error::config("port", "must be greater than 0")),
        Ok(p) if p <= u16::MAX as u32 => Ok(p as u16),
        Ok(p) => Err(Error::config("port", format!("{} is out of range", p))),
        Err(_) => Err(Error::config(
            "port",
            format!("`{}` is not an integer", value),
        )),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Validated cache connection configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    database: u32,
    connect_timeout: Duration,
    health_check_interval: Option<Duration>,
}

impl ConnectionConfig {
    /// Create a builder
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_lifeline::ConnectionConfig;
    /// use std::time::Duration;
    ///
    /// let config = ConnectionConfig::builder("localhost", 6379)
    ///     .password("secret")
    ///     .database(2)
    ///     .connect_timeout(Duration::from_secs(3))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.database(), 2);
    /// ```
    pub fn builder(host: impl Into<String>, port: u16) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder {
            host: host.into(),
            port,
            username: None,
            password: None,
            database: 0,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            health_check_interval: Some(DEFAULT_HEALTH_CHECK_INTERVAL),
        }
    }

    /// Cache host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Cache port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// ACL username
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Password
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Logical database index
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Upper bound for TCP connect plus handshake
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// PING interval while the connection is ready (`None` disables it)
    pub fn health_check_interval(&self) -> Option<Duration> {
        self.health_check_interval
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("health_check_interval", &self.health_check_interval)
            .finish()
    }
}

/// Builder for [`ConnectionConfig`]
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
    database: u32,
    connect_timeout: Duration,
    health_check_interval: Option<Duration>,
}

impl ConnectionConfigBuilder {
    /// Set the ACL username
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the logical database index
    pub fn database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Set the connect + handshake timeout
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, duration: Duration) -> Self {
        self.connect_timeout = duration;
        self
    }

    /// Set the PING interval used while ready
    ///
    /// Default: 30 seconds. `None` disables health checks.
    pub fn health_check_interval(mut self, interval: Option<Duration>) -> Self {
        self.health_check_interval = interval;
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<ConnectionConfig> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(Error::config("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::config("port", "must be greater than 0"));
        }
        Ok(ConnectionConfig {
            host: host.to_string(),
            port: self.port,
            username: non_empty(self.username.as_deref()),
            password: non_empty(self.password.as_deref()),
            database: self.database,
            connect_timeout: self.connect_timeout,
            health_check_interval: self.health_check_interval,
        })
    }
}
