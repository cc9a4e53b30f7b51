//! Connection management
//!
//! This module handles:
//! * The live connection handle (handshake, commands, loss signaling)
//! * State machine enforcement

mod conn;
mod state;

pub use conn::CacheConnection;
pub use state::ConnectionState;
