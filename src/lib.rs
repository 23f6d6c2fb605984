// Copyright (c) 2026 Driftmesh
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Driftmesh - epidemic gossip core with set-reconciliation anti-entropy.
//!
//! This library provides:
//! - A content-addressed packet envelope with deterministic 16-byte IDs
//! - A Golomb-Coded Set filter for compact anti-entropy fingerprints
//! - Bounded in-memory stores (seen-set, per-sender announcements)
//! - A gossip engine: periodic sync requests, the responder algorithm,
//!   TTL-bounded flood decisions, and peer lifecycle hooks
//! - Monitoring via Prometheus metrics and structured logging
//!
//! The engine is transport-agnostic: all I/O and signing go through an
//! injected delegate, and all state is ephemeral by design.

/// Core protocol primitives (envelope, GCS filter, stores, config).
pub mod core;
/// Gossip engine, transport seams, and the flood relay window.
pub mod gossip;
/// Observability (Prometheus metrics).
pub mod monitoring;
