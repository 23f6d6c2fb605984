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

//! Capability interfaces the engine is injected with.
//!
//! The engine never performs network I/O or cryptography itself; the
//! application supplies a transport for sends and, optionally, a
//! verifier that gates inbound packets.

use crate::core::types::Packet;
use thiserror::Error;

/// Failure reported by the transport delegate.
///
/// The engine does not interpret the message; sends are fire-and-forget
/// and never retried.
#[derive(Debug, Error)]
#[error("transport: {0}")]
pub struct TransportError(pub String);

/// The engine's only route to the outside world.
pub trait TransportDelegate: Send + Sync {
    /// Disseminate to all currently-reachable peers.
    fn send_broadcast(&self, packet: &Packet) -> Result<(), TransportError>;

    /// Direct send; `peer_id` is a hex-encoded sender identity.
    fn send_to_peer(&self, peer_id: &str, packet: &Packet) -> Result<(), TransportError>;

    /// Return the packet with its signature populated, or unchanged if
    /// signing is disabled.
    fn sign_for_broadcast(&self, packet: Packet) -> Packet;
}

/// Optional inbound signature gate.
///
/// When injected, packets must pass `verify` and the timestamp
/// acceptance window before reaching the stores.
pub trait PacketVerifier: Send + Sync {
    /// Whether the packet's signature is acceptable.
    fn verify(&self, packet: &Packet) -> bool;
}
