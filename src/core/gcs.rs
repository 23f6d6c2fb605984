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

//! Golomb-Coded Set filter: a compact probabilistic summary of the
//! packet IDs a node holds.
//!
//! A requester summarizes the IDs it *has*; a responder sends any
//! locally-held packet whose ID is not "possibly in" the filter. A false
//! positive only delays a packet until the next round; false negatives
//! cannot occur for IDs that survived the size budget.
//!
//! Wire payload (big-endian): `p: u32 | m: u32 | dlen: u32 | data`.

use crate::core::types::PacketId;
use ring::digest;
use thiserror::Error;

/// Sync filter decoding error.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Declared data length exceeds the buffer.
    #[error("malformed data length")]
    Malformed,
    /// Payload exceeds the packet payload cap.
    #[error("payload exceeds size cap")]
    TooLarge,
}

/// Number of bits per bucket for a target false-positive rate.
///
/// `p = clamp(ceil(-log2(fpr)), 1, 32)`.
pub fn derive_p(target_fpr: f64) -> u32 {
    let bits = (-target_fpr.log2()).ceil();
    if !bits.is_finite() {
        return 32;
    }
    (bits as i64).clamp(1, 32) as u32
}

/// Maximum number of IDs representable in `max_bytes` at `p` bits each.
pub fn max_ids(max_bytes: usize, p: u32) -> usize {
    (max_bytes * 8) / p.max(1) as usize
}

/// Map a packet ID to its bucket: `be_u32(SHA-256(id)[0..4]) mod m`.
///
/// Only the first four digest bytes participate; both ends of the wire
/// must agree on this.
pub fn bucket_of(id: &PacketId, m: u64) -> u32 {
    let d = digest::digest(&digest::SHA256, id.as_bytes());
    let mut four = [0u8; 4];
    four.copy_from_slice(&d.as_ref()[..4]);
    let word = u32::from_be_bytes(four) as u64;
    (word % m.max(1)) as u32
}

/// A built or decoded GCS filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GcsFilter {
    /// Bits per bucket.
    pub p: u32,
    /// Modulus (`2^p` when built non-empty; 1 for the empty variant).
    pub m: u64,
    /// Variable-length delta-encoded sorted buckets.
    pub data: Vec<u8>,
}

/// Decoded filter ready for membership queries.
#[derive(Clone, Debug)]
pub struct GcsBucketSet {
    m: u64,
    buckets: Vec<u32>,
}

impl GcsBucketSet {
    /// Modulus the requester hashed with.
    pub fn modulus(&self) -> u64 {
        self.m
    }

    /// Decoded sorted buckets.
    pub fn buckets(&self) -> &[u32] {
        &self.buckets
    }

    /// Whether `bucket` is possibly in the set.
    pub fn contains_bucket(&self, bucket: u32) -> bool {
        self.buckets.binary_search(&bucket).is_ok()
    }

    /// Whether the ID's bucket is possibly in the set.
    pub fn contains_id(&self, id: &PacketId) -> bool {
        self.contains_bucket(bucket_of(id, self.m))
    }
}

/// Append one delta in the wire varint form.
///
/// Values below 128 take one byte; larger values take two, the first
/// carrying the low 7 bits behind the continuation bit and the second
/// the next 8 bits. The two-byte form tops out at 15 bits; larger deltas
/// truncate, matching what legacy senders put on the wire.
fn encode_delta(delta: u32, out: &mut Vec<u8>) {
    if delta < 0x80 {
        out.push(delta as u8);
    } else {
        out.push(0x80 | (delta & 0x7F) as u8);
        out.push(((delta >> 7) & 0xFF) as u8);
    }
}

fn delta_width(delta: u32) -> usize {
    if delta < 0x80 {
        1
    } else {
        2
    }
}

impl GcsFilter {
    /// Empty-set variant: no data, modulus 1, no query can match.
    pub fn empty(p: u32) -> Self {
        Self {
            p,
            m: 1,
            data: Vec::new(),
        }
    }

    /// Build a filter over `ids` within `max_bytes` at `target_fpr`.
    ///
    /// Buckets are sorted and delta-encoded; duplicates are kept as zero
    /// deltas. If the encoding would exceed the budget, trailing deltas
    /// are dropped whole so any prefix of `data` stays decodable.
    pub fn build<'a, I>(ids: I, max_bytes: usize, target_fpr: f64) -> Self
    where
        I: IntoIterator<Item = &'a PacketId>,
    {
        let p = derive_p(target_fpr);
        let m = 1u64 << p;

        let mut buckets: Vec<u32> = ids.into_iter().map(|id| bucket_of(id, m)).collect();
        if buckets.is_empty() {
            return Self::empty(p);
        }
        buckets.sort_unstable();

        let mut data = Vec::with_capacity(max_bytes.min(buckets.len() * 2));
        let mut prev = 0u32;
        for b in buckets {
            let delta = b - prev;
            if data.len() + delta_width(delta) > max_bytes {
                break;
            }
            encode_delta(delta, &mut data);
            prev = b;
        }

        Self { p, m, data }
    }

    /// Decode the sorted bucket sequence.
    ///
    /// Reconstructed values at or beyond the modulus are discarded; a
    /// trailing partial two-byte delta is ignored.
    pub fn decode_buckets(&self) -> Vec<u32> {
        let m = self.effective_modulus();
        let mut out = Vec::new();
        let mut acc = 0u64;
        let mut i = 0usize;
        while i < self.data.len() {
            let b0 = self.data[i];
            let delta = if b0 & 0x80 == 0 {
                i += 1;
                b0 as u64
            } else {
                if i + 1 >= self.data.len() {
                    break;
                }
                let lo = (b0 & 0x7F) as u64;
                let hi = self.data[i + 1] as u64;
                i += 2;
                lo | (hi << 7)
            };
            acc += delta;
            if acc < m {
                out.push(acc as u32);
            }
        }
        out
    }

    /// Decode into a queryable bucket set.
    pub fn to_bucket_set(&self) -> GcsBucketSet {
        GcsBucketSet {
            m: self.effective_modulus(),
            buckets: self.decode_buckets(),
        }
    }

    fn effective_modulus(&self) -> u64 {
        if self.m == 0 {
            // Wire m wraps to zero at p = 32; recompute from p.
            1u64 << self.p.min(32)
        } else {
            self.m
        }
    }

    /// Encode the REQUEST_SYNC wire payload.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(12 + self.data.len());
        out.extend_from_slice(&self.p.to_be_bytes());
        out.extend_from_slice(&(self.m as u32).to_be_bytes());
        out.extend_from_slice(&(self.data.len() as u32).to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    /// Decode a REQUEST_SYNC wire payload.
    ///
    /// Anything shorter than the 12-byte header decodes as the empty
    /// filter: an empty filter is meaningful ("I hold nothing") and
    /// truncated headers from older senders must stay acceptable. A
    /// declared data length that overruns the buffer is malformed.
    pub fn decode(bytes: &[u8]) -> Result<Self, FilterError> {
        if bytes.len() > crate::core::types::MAX_PAYLOAD_BYTES {
            return Err(FilterError::TooLarge);
        }
        if bytes.len() < 12 {
            return Ok(Self::empty(1));
        }
        let mut word = [0u8; 4];
        word.copy_from_slice(&bytes[0..4]);
        let p = u32::from_be_bytes(word).min(32);
        word.copy_from_slice(&bytes[4..8]);
        let m = u32::from_be_bytes(word) as u64;
        word.copy_from_slice(&bytes[8..12]);
        let dlen = u32::from_be_bytes(word) as usize;

        if dlen > bytes.len() - 12 {
            return Err(FilterError::Malformed);
        }
        Ok(Self {
            p,
            m,
            data: bytes[12..12 + dlen].to_vec(),
        })
    }
}
