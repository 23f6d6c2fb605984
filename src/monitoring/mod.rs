#![forbid(unsafe_code)]

//! Observability: Prometheus metrics for the gossip plane.

/// Metrics container and registration.
pub mod metrics;
