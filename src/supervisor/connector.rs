//! Seams between the supervisor and the transport

use crate::config::ConnectionConfig;
use crate::connection::CacheConnection;
use crate::Result;
use std::future::Future;

/// A live connection as seen by the supervisor and the gate
pub trait Link: Send + Sync + 'static {
    /// True once the connection can no longer be used
    fn is_lost(&self) -> bool;

    /// Resolves once the connection is lost
    fn lost(&self) -> impl Future<Output = ()> + Send + '_;

    /// Cheap liveness probe, run periodically while ready
    ///
    /// May report success without probing when the connection is visibly busy.
    fn health_check(&self) -> impl Future<Output = Result<()>> + Send + '_;

    /// Release the connection; must not wait on in-flight operations
    fn close(&self) -> impl Future<Output = ()> + Send + '_;
}

/// Opens connections on behalf of the supervisor
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced
    type Link: Link;

    /// Open the transport and complete the handshake
    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> impl Future<Output = Result<Self::Link>> + Send + 'a;
}

/// Production connector: a multiplexed Redis connection over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Link = CacheConnection;

    fn connect<'a>(
        &'a self,
        config: &'a ConnectionConfig,
    ) -> impl Future<Output = Result<CacheConnection>> + Send + 'a {
        CacheConnection::connect(config)
    }
}

impl Link for CacheConnection {
    fn is_lost(&self) -> bool {
        CacheConnection::is_lost(self)
    }

    fn lost(&self) -> impl Future<Output = ()> + Send + '_ {
        CacheConnection::lost(self)
    }

    fn health_check(&self) -> impl Future<Output = Result<()>> + Send + '_ {
        CacheConnection::health_check(self)
    }

    fn close(&self) -> impl Future<Output = ()> + Send + '_ {
        CacheConnection::close(self)
    }
}
