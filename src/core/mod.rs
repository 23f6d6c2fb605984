#![forbid(unsafe_code)]

//! Core protocol primitives: envelope, sync filter, stores, config.

/// Engine configuration and validation.
pub mod config;
/// Golomb-Coded Set filter and its wire codec.
pub mod gcs;
/// Seen-set, announcement map, and the observe path.
pub mod store;
/// Packet envelope, identity, and canonical encoding.
pub mod types;
