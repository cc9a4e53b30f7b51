//! Counter and histogram helpers

use super::labels;
use crate::connection::ConnectionState;
use crate::Error;
use std::time::Duration;

/// Record one connect attempt and how long it took
///
/// `error` is the failure, if any; its category becomes the `error` label.
pub fn connect_attempt(error: Option<&Error>, elapsed: Duration) {
    let (result, category) = match error {
        None => (labels::RESULT_SUCCESS, labels::ERROR_NONE),
        Some(e) => (labels::RESULT_FAILURE, e.category()),
    };
    metrics::counter!(
        labels::CONNECT_ATTEMPTS,
        "result" => result,
        "error" => category
    )
    .increment(1);
    metrics::histogram!(labels::CONNECT_DURATION, "result" => result).record(elapsed.as_secs_f64());
}

/// Record a state transition
pub fn state_transition(from: ConnectionState, to: ConnectionState) {
    metrics::counter!(
        labels::STATE_TRANSITIONS,
        "from" => state_label(from),
        "to" => state_label(to)
    )
    .increment(1);
}

/// Record a call the gate refused or that lost its connection
pub fn gate_rejection(reason: &'static str) {
    metrics::counter!(labels::GATE_REJECTIONS, "reason" => reason).increment(1);
}

/// Record an invalid configuration field
pub fn config_error(field: &'static str) {
    metrics::counter!(labels::CONFIG_ERRORS, "field" => field).increment(1);
}

pub(crate) fn state_label(state: ConnectionState) -> &'static str {
    match state {
        ConnectionState::Idle => "idle",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Ready => "ready",
        ConnectionState::Reconnecting => "reconnecting",
        ConnectionState::Failed => "failed",
        ConnectionState::Closed => "closed",
    }
}
