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

use driftmesh::core::store::{Observation, PacketStore};
use driftmesh::core::types::{Packet, PacketType};

fn message(sender: &[u8], payload: &[u8], ts: u64) -> Packet {
    Packet {
        packet_type: PacketType::Message,
        sender_id: sender.to_vec(),
        recipient_id: None,
        timestamp_ms: ts,
        payload: payload.to_vec(),
        signature: None,
        ttl: 5,
    }
}

fn announce(sender: &[u8], ts: u64) -> Packet {
    Packet {
        packet_type: PacketType::Announce,
        sender_id: sender.to_vec(),
        recipient_id: None,
        timestamp_ms: ts,
        payload: b"nick".to_vec(),
        signature: None,
        ttl: 5,
    }
}

#[test]
fn duplicate_message_is_dropped() {
    let mut store = PacketStore::new(16);
    let m = message(b"\x01", b"hi", 1);
    let id = m.id();

    let (obs, _) = store.observe(m.clone());
    assert_eq!(obs, Observation::NewMessage);

    let (obs, _) = store.observe(m);
    assert_eq!(obs, Observation::DuplicateMessage);

    assert_eq!(store.seen.len(), 1);
    assert_eq!(store.seen.ids(), vec![id]);
}

#[test]
fn capacity_eviction_is_fifo() {
    let mut store = PacketStore::new(3);
    let m1 = message(b"\x01", b"one", 1);
    let m2 = message(b"\x01", b"two", 2);
    let m3 = message(b"\x01", b"three", 3);
    let m4 = message(b"\x01", b"four", 4);

    store.observe(m1.clone());
    store.observe(m2.clone());
    store.observe(m3.clone());
    let (obs, evicted) = store.observe(m4.clone());

    assert_eq!(obs, Observation::NewMessage);
    assert_eq!(evicted, Some(m1.id()));
    assert_eq!(store.seen.ids(), vec![m2.id(), m3.id(), m4.id()]);
}

#[test]
fn capacity_bound_holds_under_churn() {
    let mut store = PacketStore::new(10);
    let mut all = Vec::new();
    for i in 0..50u64 {
        let m = message(b"\x02", format!("payload-{i}").as_bytes(), i);
        all.push(m.id());
        store.observe(m);
    }
    assert_eq!(store.seen.len(), 10);
    // Retained entries are the ten most recently inserted distinct IDs.
    assert_eq!(store.seen.ids(), all[40..].to_vec());
}

#[test]
fn directed_messages_are_not_stored() {
    let mut store = PacketStore::new(16);
    let mut m = message(b"\x01", b"private", 1);
    m.recipient_id = Some(vec![0x0A; 8]);

    let (obs, _) = store.observe(m);
    assert_eq!(obs, Observation::Ignored);
    assert!(store.seen.is_empty());
}

#[test]
fn sentinel_recipient_is_broadcast_class() {
    let mut store = PacketStore::new(16);
    let mut m = message(b"\x01", b"everyone", 1);
    m.recipient_id = Some(vec![0xFF; 8]);

    let (obs, _) = store.observe(m);
    assert_eq!(obs, Observation::NewMessage);
    assert_eq!(store.seen.len(), 1);
}

#[test]
fn announcement_last_arrival_wins() {
    let mut store = PacketStore::new(16);
    let first = announce(b"\xAB\xCD", 100);
    // An older timestamp arriving later still replaces the entry.
    let second = announce(b"\xAB\xCD", 50);

    let (obs, _) = store.observe(first);
    assert_eq!(obs, Observation::AnnouncementStored);

    let (obs, _) = store.observe(second.clone());
    assert_eq!(obs, Observation::AnnouncementReplaced);

    assert_eq!(store.announcements.len(), 1);
    let stored = store.announcements.get("abcd").unwrap();
    assert_eq!(stored.timestamp_ms, second.timestamp_ms);
}

#[test]
fn non_store_types_are_ignored() {
    let mut store = PacketStore::new(16);
    for kind in [
        PacketType::RequestSync,
        PacketType::Transaction,
        PacketType::Leave,
        PacketType::HandshakeInit,
    ] {
        let mut p = message(b"\x01", b"x", 1);
        p.packet_type = kind;
        let (obs, _) = store.observe(p);
        assert_eq!(obs, Observation::Ignored);
    }
    assert!(store.seen.is_empty());
    assert!(store.announcements.is_empty());
}

#[test]
fn remove_peer_purges_announcement_and_messages() {
    let mut store = PacketStore::new(16);
    let p1 = [0xAB, 0xCD];
    let p2 = [0x12, 0x34];

    store.observe(announce(&p1, 1));
    store.observe(announce(&p2, 2));
    store.observe(message(&p1, b"from p1 a", 3));
    store.observe(message(&p1, b"from p1 b", 4));
    let keep = message(&p2, b"from p2", 5);
    store.observe(keep.clone());

    // Case-insensitive peer id.
    let (removed, purged) = store.remove_peer("ABCD");
    assert!(removed);
    assert_eq!(purged, 2);

    assert!(store.announcements.get("abcd").is_none());
    assert!(store.announcements.get("1234").is_some());
    assert_eq!(store.seen.ids(), vec![keep.id()]);
}

#[test]
fn remove_unknown_peer_is_a_noop() {
    let mut store = PacketStore::new(16);
    store.observe(message(b"\x01", b"hi", 1));

    let (removed, purged) = store.remove_peer("ffff");
    assert!(!removed);
    assert_eq!(purged, 0);
    assert_eq!(store.seen.len(), 1);
}
