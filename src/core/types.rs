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

//! Packet envelope, content-addressed identity, and canonical encoding.

use bincode::Options;
use ring::digest;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Hard cap on packet payload size (512 KiB).
pub const MAX_PAYLOAD_BYTES: usize = 512 * 1024;

/// Recipient value treated as broadcast by legacy senders.
pub const BROADCAST_RECIPIENT: [u8; 8] = [0xFF; 8];

/// Canonical serialization error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("serialization")]
    Serialize,
    #[error("deserialization")]
    Deserialize,
    #[error("size limit exceeded")]
    TooLarge,
}

/// Envelope validation error.
#[derive(Debug, Error)]
pub enum PacketError {
    /// Payload is empty.
    #[error("empty payload")]
    EmptyPayload,
    /// Payload exceeds [`MAX_PAYLOAD_BYTES`].
    #[error("payload exceeds size cap")]
    PayloadTooLarge,
    /// TTL exceeds the configured maximum.
    #[error("ttl exceeds maximum")]
    TtlTooLarge,
    /// Timestamp outside the acceptance window.
    #[error("timestamp outside acceptance window")]
    Expired,
}

/// Canonical bincode options (deterministic).
fn bincode_opts() -> impl Options {
    // Fixint encoding provides a stable integer representation.
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

/// Encode with deterministic rules.
pub fn encode_canonical<T: Serialize>(v: &T) -> Result<Vec<u8>, CodecError> {
    bincode_opts()
        .serialize(v)
        .map_err(|_| CodecError::Serialize)
}

/// Decode with a hard size cap.
pub fn decode_canonical_limited<T: DeserializeOwned>(
    bytes: &[u8],
    max: usize,
) -> Result<T, CodecError> {
    // Fast-path cap on the raw wire payload.
    if bytes.len() > max {
        return Err(CodecError::TooLarge);
    }
    // Defensive cap inside the deserializer to prevent memory/CPU bombs via large container lengths.
    bincode_opts()
        .with_limit(max as u64)
        .deserialize(bytes)
        .map_err(|_| CodecError::Deserialize)
}

/// Wire packet kinds. The discriminant is the `type` octet hashed into
/// the packet ID, so the values are part of the wire contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// Broadcast chat message.
    Message,
    /// Peer presence announcement.
    Announce,
    /// Anti-entropy sync request carrying a GCS filter.
    RequestSync,
    /// Relayed transaction (pass-through for the gossip core).
    Transaction,
    /// Peer departure notice.
    Leave,
    /// Handshake initiation (pass-through).
    HandshakeInit,
    /// Handshake response (pass-through).
    HandshakeResp,
    /// Handshake finalization (pass-through).
    HandshakeFinal,
}

impl PacketType {
    /// One-byte wire discriminant.
    pub fn wire_byte(self) -> u8 {
        match self {
            PacketType::Message => 0x01,
            PacketType::Announce => 0x02,
            PacketType::RequestSync => 0x03,
            PacketType::Transaction => 0x04,
            PacketType::Leave => 0x05,
            PacketType::HandshakeInit => 0x06,
            PacketType::HandshakeResp => 0x07,
            PacketType::HandshakeFinal => 0x08,
        }
    }
}

/// 16-byte content-addressed packet identifier.
///
/// Derived as the first 16 bytes of
/// `SHA-256(type || sender_id || recipient_or_empty || ascii(timestamp) || payload)`.
/// The ID is the sole deduplication key and the sole input to the sync
/// filter; it never appears on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId([u8; 16]);

impl PacketId {
    /// Construct from raw bytes.
    pub fn from_bytes(b: [u8; 16]) -> Self {
        Self(b)
    }
    /// Return bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// The gossip wire envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Packet kind.
    pub packet_type: PacketType,
    /// Sender identity (typically a public key fingerprint).
    pub sender_id: Vec<u8>,
    /// Recipient identity; `None` means broadcast.
    #[serde(default)]
    pub recipient_id: Option<Vec<u8>>,
    /// Sender wall-clock timestamp in milliseconds since UNIX epoch.
    pub timestamp_ms: u64,
    /// Opaque payload, 1..=524288 bytes.
    pub payload: Vec<u8>,
    /// Opaque signature bytes, if the sender signed the packet.
    #[serde(default)]
    pub signature: Option<Vec<u8>>,
    /// Remaining hop budget; 0 means "do not forward".
    pub ttl: u8,
}

impl Packet {
    /// Whether this packet addresses all peers.
    ///
    /// An absent recipient is broadcast; so is the legacy 8-byte
    /// all-`0xFF` sentinel.
    pub fn is_broadcast(&self) -> bool {
        match &self.recipient_id {
            None => true,
            Some(r) => r.as_slice() == BROADCAST_RECIPIENT,
        }
    }

    /// Lowercase hex rendering of the sender identity.
    pub fn sender_hex(&self) -> String {
        hex::encode(&self.sender_id)
    }

    /// Compute the content-addressed packet ID.
    pub fn id(&self) -> PacketId {
        let ts = self.timestamp_ms.to_string();
        let recipient: &[u8] = self.recipient_id.as_deref().unwrap_or(&[]);
        let mut buf = Vec::with_capacity(
            1 + self.sender_id.len() + recipient.len() + ts.len() + self.payload.len(),
        );
        buf.push(self.packet_type.wire_byte());
        buf.extend_from_slice(&self.sender_id);
        buf.extend_from_slice(recipient);
        buf.extend_from_slice(ts.as_bytes());
        buf.extend_from_slice(&self.payload);

        let d = digest::digest(&digest::SHA256, &buf);
        let mut out = [0u8; 16];
        out.copy_from_slice(&d.as_ref()[..16]);
        PacketId(out)
    }

    /// Validate envelope field ranges (fail closed).
    pub fn validate(&self, max_ttl: u8) -> Result<(), PacketError> {
        if self.payload.is_empty() {
            return Err(PacketError::EmptyPayload);
        }
        if self.payload.len() > MAX_PAYLOAD_BYTES {
            return Err(PacketError::PayloadTooLarge);
        }
        if self.ttl > max_ttl {
            return Err(PacketError::TtlTooLarge);
        }
        Ok(())
    }

    /// Check the timestamp acceptance window.
    ///
    /// Applied on the observe path only when a packet verifier is
    /// injected: the timestamp must not be further than `skew_ms` in the
    /// future nor older than `max_age_ms`.
    pub fn fresh_at(&self, now_ms: u64, max_age_ms: u64, skew_ms: u64) -> Result<(), PacketError> {
        if self.timestamp_ms > now_ms.saturating_add(skew_ms) {
            return Err(PacketError::Expired);
        }
        if self.timestamp_ms < now_ms.saturating_sub(max_age_ms) {
            return Err(PacketError::Expired);
        }
        Ok(())
    }
}

/// Encode a packet with the canonical codec.
pub fn encode_packet(p: &Packet) -> Result<Vec<u8>, CodecError> {
    encode_canonical(p)
}

/// Decode a packet with the canonical codec, bounded by the payload cap
/// plus envelope overhead.
pub fn decode_packet(bytes: &[u8]) -> Result<Packet, CodecError> {
    // Envelope fields outside the payload are small; 4 KiB of headroom is plenty.
    decode_canonical_limited(bytes, MAX_PAYLOAD_BYTES + 4096)
}
