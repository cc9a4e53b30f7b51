//! Live cache connection (the shared handle)

use crate::config::ConnectionConfig;
use crate::{Error, Result};
use redis::aio::MultiplexedConnection;
use redis::{ConnectionAddr, ConnectionInfo, FromRedisValue, RedisConnectionInfo};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::Instrument;

const QUIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Loss flag and in-flight accounting for one connection
#[derive(Debug, Default)]
struct Liveness {
    lost: AtomicBool,
    notify: Notify,
    in_flight: AtomicUsize,
}

impl Liveness {
    fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Returns true if this call flipped the flag
    fn mark_lost(&self) -> bool {
        let first = !self.lost.swap(true, Ordering::AcqRel);
        if first {
            self.notify.notify_waiters();
        }
        first
    }

    async fn lost(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_lost() {
                return;
            }
            notified.await;
        }
    }

    fn busy(&self) -> Busy<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        Busy(self)
    }

    fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }
}

/// Counts one command as in flight until dropped
struct Busy<'a>(&'a Liveness);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// An open, authenticated connection to the cache
///
/// Shared as `Arc<CacheConnection>` while the supervisor is ready. Commands are
/// multiplexed over one socket by the Redis client. A transport failure on any
/// command marks the connection lost, after which every command fails with
/// [`Error::ConnectionLost`]. The connection never reconnects by itself.
pub struct CacheConnection {
    conn: MultiplexedConnection,
    liveness: Liveness,
    peer: String,
}

impl std::fmt::Debug for CacheConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConnection")
            .field("peer", &self.peer)
            .field("lost", &self.is_lost())
            .finish()
    }
}

impl CacheConnection {
    /// Open a TCP connection and run the handshake, bounded by the connect timeout
    ///
    /// The Redis client sends AUTH and SELECT from the configured credentials
    /// and database as part of the handshake.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let peer = format!("{}:{}", config.host(), config.port());
        let timeout = config.connect_timeout();
        let client = redis::Client::open(connection_info(config))?;

        let span = tracing::debug_span!("handshake", peer = %peer, database = config.database());
        let handshake = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .instrument(span)
            .await;
        match handshake {
            Ok(Ok(conn)) => {
                tracing::debug!(peer = %peer, "handshake complete");
                Ok(Self::new(conn, peer))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(Error::Connect(format!(
                "handshake with {} timed out after {:?}",
                peer, timeout
            ))),
        }
    }

    /// Wrap an already established connection
    pub fn new(conn: MultiplexedConnection, peer: impl Into<String>) -> Self {
        Self {
            conn,
            liveness: Liveness::default(),
            peer: peer.into(),
        }
    }

    /// Run one command and convert its reply
    ///
    /// Error replies from the server come back as [`Error::Redis`] and leave the
    /// connection usable. Transport failures mark it lost.
    pub async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        if self.is_lost() {
            return Err(Error::ConnectionLost);
        }

        let _busy = self.liveness.busy();
        let mut conn = self.conn.clone();
        let reply: redis::RedisResult<T> = cmd.query_async(&mut conn).await;
        reply.map_err(|e| {
            let e = Error::from(e);
            if e.is_fatal_to_connection() {
                tracing::debug!(peer = %self.peer, error = %e, "transport failure, marking connection lost");
                self.mark_lost();
            }
            e
        })
    }

    /// Run a command given as plain arguments, returning the raw reply
    pub async fn command(&self, args: &[&str]) -> Result<redis::Value> {
        let Some((name, rest)) = args.split_first() else {
            return Err(Error::UnexpectedReply("empty command".into()));
        };
        let mut cmd = redis::cmd(name);
        for arg in rest {
            cmd.arg(*arg);
        }
        self.query(&cmd).await
    }

    /// Send PING and expect PONG
    pub async fn ping(&self) -> Result<()> {
        let pong: String = self.query(&redis::cmd("PING")).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(Error::UnexpectedReply(format!("PING answered {:?}", pong)))
        }
    }

    /// Liveness check used by the supervisor
    ///
    /// Skipped while a caller's command is in flight: a slow command such as
    /// BLPOP would hold the PING reply back and fail a healthy connection.
    pub async fn health_check(&self) -> Result<()> {
        if self.liveness.is_busy() {
            tracing::trace!(peer = %self.peer, "command in flight, skipping health check");
            return Ok(());
        }
        self.ping().await
    }

    /// True once the connection can no longer be used
    pub fn is_lost(&self) -> bool {
        self.liveness.is_lost()
    }

    /// Flag the connection as lost and wake anyone waiting in [`lost`](Self::lost)
    pub fn mark_lost(&self) {
        self.liveness.mark_lost();
    }

    /// Resolves once the connection is lost
    pub async fn lost(&self) {
        self.liveness.lost().await
    }

    /// Stop accepting commands and send QUIT (best effort)
    ///
    /// Never waits on a command that is still in flight; in that case the
    /// connection is only marked lost and the socket closes once the last
    /// caller lets go of it.
    pub async fn close(&self) {
        let was_live = self.liveness.mark_lost();
        if !was_live || self.liveness.is_busy() {
            return;
        }

        let mut conn = self.conn.clone();
        let quit = redis::cmd("QUIT");
        let goodbye = quit.query_async::<()>(&mut conn);
        match tokio::time::timeout(QUIT_TIMEOUT, goodbye).await {
            Ok(Ok(())) => tracing::debug!(peer = %self.peer, "connection closed"),
            Ok(Err(e)) => tracing::debug!(peer = %self.peer, error = %e, "error while closing connection"),
            Err(_) => tracing::debug!(peer = %self.peer, "timed out closing connection"),
        }
    }

    /// Remote address label
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

/// Client parameters for `config`
fn connection_info(config: &ConnectionConfig) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(config.host().to_string(), config.port()),
        redis: RedisConnectionInfo {
            db: i64::from(config.database()),
            username: config.username().map(str::to_string),
            password: config.password().map(str::to_string),
            ..Default::default()
        },
    }
}
