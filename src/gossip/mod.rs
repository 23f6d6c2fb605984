#![forbid(unsafe_code)]

//! Gossip engine and the seams it is injected through.

/// The gossip engine: timers, responder, lifecycle hooks.
pub mod engine;
/// Relay dedup window for the TTL flood path.
pub mod flood;
/// Transport delegate and packet verifier traits.
pub mod transport;
