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

//! In-memory gossip state: the bounded insertion-ordered seen-set of
//! broadcast messages and the per-sender latest-announcement map.
//!
//! All state here is ephemeral. A fresh session starts empty on every
//! process start; nothing is ever written to disk.

use crate::core::types::{Packet, PacketId, PacketType};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Outcome of classifying an observed public packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// Broadcast message stored; deliver locally.
    NewMessage,
    /// Broadcast message already in the seen-set; drop.
    DuplicateMessage,
    /// First announcement stored for this sender.
    AnnouncementStored,
    /// Announcement replaced a prior entry for this sender.
    AnnouncementReplaced,
    /// Packet type or addressing outside the store's interest.
    Ignored,
}

/// Bounded insertion-ordered store of broadcast MESSAGE packets.
///
/// Keyed by packet ID; at capacity the oldest entry is evicted first.
pub struct SeenStore {
    capacity: usize,
    order: VecDeque<PacketId>,
    packets: HashMap<PacketId, Packet>,
}

impl SeenStore {
    /// Create a store holding at most `capacity` packets.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::with_capacity(capacity.max(1)),
            packets: HashMap::with_capacity(capacity.max(1)),
        }
    }

    /// Number of stored packets.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether an ID is present.
    pub fn contains(&self, id: &PacketId) -> bool {
        self.packets.contains_key(id)
    }

    /// Insert at the tail; returns the evicted ID if capacity overflowed.
    ///
    /// The caller is responsible for the duplicate check.
    pub fn insert(&mut self, id: PacketId, packet: Packet) -> Option<PacketId> {
        self.order.push_back(id);
        self.packets.insert(id, packet);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.packets.remove(&oldest);
                return Some(oldest);
            }
        }
        None
    }

    /// Iterate stored packets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PacketId, &Packet)> {
        self.order
            .iter()
            .filter_map(move |id| self.packets.get(id).map(|p| (id, p)))
    }

    /// IDs in insertion order.
    pub fn ids(&self) -> Vec<PacketId> {
        self.order.iter().copied().collect()
    }

    /// Remove every packet whose sender matches `sender_hex_lower`.
    ///
    /// Returns the number of packets removed.
    pub fn purge_sender(&mut self, sender_hex_lower: &str) -> usize {
        let before = self.order.len();
        self.packets
            .retain(|_, p| p.sender_hex() != sender_hex_lower);
        let packets = &self.packets;
        self.order.retain(|id| packets.contains_key(id));
        before - self.order.len()
    }
}

/// Latest ANNOUNCE per sender, keyed by lowercase hex sender identity.
///
/// Tie-break is last-arrival-wins: whichever announcement the transport
/// hands over last replaces the entry, regardless of timestamps. Both
/// ends of the wire share this rule.
pub struct AnnouncementMap {
    entries: BTreeMap<String, Packet>,
}

impl AnnouncementMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Number of senders with a stored announcement.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store `packet` as the sender's latest announcement.
    ///
    /// Returns true if a prior entry was replaced.
    pub fn upsert(&mut self, packet: Packet) -> bool {
        self.entries.insert(packet.sender_hex(), packet).is_some()
    }

    /// Latest announcement for a sender (case-insensitive hex).
    pub fn get(&self, sender_hex: &str) -> Option<&Packet> {
        self.entries.get(&sender_hex.to_ascii_lowercase())
    }

    /// Remove a sender's announcement (case-insensitive hex).
    pub fn remove(&mut self, sender_hex: &str) -> Option<Packet> {
        self.entries.remove(&sender_hex.to_ascii_lowercase())
    }

    /// Iterate announcements in sender-key order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.entries.values()
    }

    /// Sender keys in map order.
    pub fn senders(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

impl Default for AnnouncementMap {
    fn default() -> Self {
        Self::new()
    }
}

/// The gossip plane's combined in-memory state.
pub struct PacketStore {
    /// Broadcast message log.
    pub seen: SeenStore,
    /// Per-sender latest announcements.
    pub announcements: AnnouncementMap,
}

impl PacketStore {
    /// Create with the given seen-set capacity.
    pub fn new(seen_capacity: usize) -> Self {
        Self {
            seen: SeenStore::new(seen_capacity),
            announcements: AnnouncementMap::new(),
        }
    }

    /// Classify and store one observed public packet.
    ///
    /// Pure state mutation: no I/O, idempotent for duplicate broadcast
    /// messages. Returns the classification and any evicted ID.
    pub fn observe(&mut self, packet: Packet) -> (Observation, Option<PacketId>) {
        match packet.packet_type {
            PacketType::Message => {
                if !packet.is_broadcast() {
                    return (Observation::Ignored, None);
                }
                let id = packet.id();
                if self.seen.contains(&id) {
                    return (Observation::DuplicateMessage, None);
                }
                let evicted = self.seen.insert(id, packet);
                (Observation::NewMessage, evicted)
            }
            PacketType::Announce => {
                if self.announcements.upsert(packet) {
                    (Observation::AnnouncementReplaced, None)
                } else {
                    (Observation::AnnouncementStored, None)
                }
            }
            _ => (Observation::Ignored, None),
        }
    }

    /// Purge all state attributed to a departed peer.
    ///
    /// Removes the announcement and every seen-set packet whose sender
    /// matches `peer_id` (hex, case-insensitive). Returns whether an
    /// announcement was removed and how many messages were purged.
    pub fn remove_peer(&mut self, peer_id: &str) -> (bool, usize) {
        let key = peer_id.to_ascii_lowercase();
        let removed = self.announcements.remove(&key).is_some();
        let purged = self.seen.purge_sender(&key);
        (removed, purged)
    }
}
