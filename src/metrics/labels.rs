//! Metric names and label values

/// Connect attempts, labelled by `result` and `error`
pub const CONNECT_ATTEMPTS: &str = "cache_lifeline_connect_attempts_total";
/// Connect attempt duration in seconds
pub const CONNECT_DURATION: &str = "cache_lifeline_connect_duration_seconds";
/// State transitions, labelled by `from` and `to`
pub const STATE_TRANSITIONS: &str = "cache_lifeline_state_transitions_total";
/// Calls refused or failed at the gate, labelled by `reason`
pub const GATE_REJECTIONS: &str = "cache_lifeline_gate_rejections_total";
/// Invalid configuration detected at startup, labelled by `field`
pub const CONFIG_ERRORS: &str = "cache_lifeline_config_errors_total";
/// Current retry counter
pub const RETRY_COUNT: &str = "cache_lifeline_retry_count";
/// 1 while ready, 0 otherwise
pub const READY: &str = "cache_lifeline_ready";

/// Connect attempt succeeded
pub const RESULT_SUCCESS: &str = "success";
/// Connect attempt failed
pub const RESULT_FAILURE: &str = "failure";
/// `error` label of a successful connect attempt
pub const ERROR_NONE: &str = "none";

/// Gate refused because the cache was not ready
pub const REASON_UNAVAILABLE: &str = "unavailable";
/// Operation failed because the connection died mid-call
pub const REASON_CONNECTION_LOST: &str = "connection_lost";
