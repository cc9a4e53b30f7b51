//! Gauge helpers

use super::labels;
use crate::connection::ConnectionState;

/// Publish the current state and retry counter
pub fn connection_state(state: ConnectionState, retry_count: u32) {
    let ready = if state == ConnectionState::Ready { 1.0 } else { 0.0 };
    metrics::gauge!(labels::READY).set(ready);
    metrics::gauge!(labels::RETRY_COUNT).set(f64::from(retry_count));
}
