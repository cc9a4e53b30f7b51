//! Metrics for the cache connection lifecycle
//!
//! Emitted through the `metrics` facade; install any recorder to collect them.
//! Nothing is recorded when no recorder is installed.

pub mod counters;
pub mod gauges;
pub mod labels;
