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

use driftmesh::core::config::GossipConfig;
use driftmesh::core::store::Observation;
use driftmesh::core::types::{Packet, PacketType};
use driftmesh::gossip::engine::GossipEngine;
use driftmesh::gossip::transport::{TransportDelegate, TransportError};
use driftmesh::monitoring::metrics::Metrics;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct SpyDelegate {
    broadcasts: Mutex<Vec<Packet>>,
    directed: Mutex<Vec<(String, Packet)>>,
}

impl TransportDelegate for SpyDelegate {
    fn send_broadcast(&self, packet: &Packet) -> Result<(), TransportError> {
        self.broadcasts.lock().unwrap().push(packet.clone());
        Ok(())
    }
    fn send_to_peer(&self, peer_id: &str, packet: &Packet) -> Result<(), TransportError> {
        self.directed
            .lock()
            .unwrap()
            .push((peer_id.to_string(), packet.clone()));
        Ok(())
    }
    fn sign_for_broadcast(&self, packet: Packet) -> Packet {
        packet
    }
}

fn new_engine() -> GossipEngine {
    let spy = Arc::new(SpyDelegate::default());
    let metrics = Arc::new(Metrics::new().unwrap());
    GossipEngine::new(vec![0x0A], GossipConfig::default(), spy, metrics).unwrap()
}

fn packet(kind: PacketType, payload: &[u8], ttl: u8) -> Packet {
    Packet {
        packet_type: kind,
        sender_id: vec![0x01, 0x02],
        recipient_id: None,
        timestamp_ms: 1_700_000_000_000,
        payload: payload.to_vec(),
        signature: None,
        ttl,
    }
}

#[test]
fn ttl_zero_is_never_forwarded() {
    let engine = new_engine();
    assert!(engine
        .prepare_relay(&packet(PacketType::Message, b"m", 0))
        .is_none());
    assert!(engine
        .prepare_relay(&packet(PacketType::Transaction, b"tx", 0))
        .is_none());
}

#[test]
fn request_sync_is_never_forwarded() {
    let engine = new_engine();
    // Even a nonzero TTL does not make a sync request relayable.
    assert!(engine
        .prepare_relay(&packet(PacketType::RequestSync, b"f", 3))
        .is_none());
}

#[test]
fn over_limit_ttl_is_not_relayed() {
    let engine = new_engine();
    assert!(engine
        .prepare_relay(&packet(PacketType::Message, b"m", 11))
        .is_none());
}

#[test]
fn relay_decrements_ttl_once_per_message() {
    let engine = new_engine();
    let m = packet(PacketType::Message, b"flood me", 3);

    let relayed = engine.prepare_relay(&m).expect("first sighting relays");
    assert_eq!(relayed.ttl, 2);
    assert_eq!(relayed.payload, m.payload);

    // After the message lands in the seen-set, relaying stops.
    engine.on_public_packet_seen(m.clone());
    assert!(engine.prepare_relay(&m).is_none());
}

#[test]
fn ingest_combines_relay_and_observe() {
    let engine = new_engine();
    let m = packet(PacketType::Message, b"combined", 4);

    let (obs, relay) = engine.ingest_public_packet(m.clone());
    assert_eq!(obs, Observation::NewMessage);
    let relay = relay.expect("first arrival is relayable");
    assert_eq!(relay.ttl, 3);

    let (obs, relay) = engine.ingest_public_packet(m);
    assert_eq!(obs, Observation::DuplicateMessage);
    assert!(relay.is_none());
}

#[test]
fn transaction_dedup_uses_relay_window() {
    let engine = new_engine();
    let tx = packet(PacketType::Transaction, b"tx bytes", 4);

    let relayed = engine.prepare_relay(&tx).expect("first sighting relays");
    assert_eq!(relayed.ttl, 3);

    // Transactions never enter the seen-set, yet the relay window still
    // suppresses the duplicate.
    assert!(engine.prepare_relay(&tx).is_none());
    assert_eq!(engine.stats().seen_messages, 0);
}

#[test]
fn directed_message_dedups_via_relay_window() {
    let engine = new_engine();
    let mut m = packet(PacketType::Message, b"direct", 4);
    m.recipient_id = Some(vec![0x0B; 8]);

    assert!(engine.prepare_relay(&m).is_some());
    assert!(engine.prepare_relay(&m).is_none());

    // Directed messages are not broadcast-class and stay out of the log.
    let (obs, _) = engine.ingest_public_packet(m);
    assert_eq!(obs, Observation::Ignored);
}

#[test]
fn announce_and_leave_are_relayable() {
    let engine = new_engine();

    let a = packet(PacketType::Announce, b"nick", 2);
    assert_eq!(engine.prepare_relay(&a).map(|p| p.ttl), Some(1));
    assert!(engine.prepare_relay(&a).is_none());

    let l = packet(PacketType::Leave, b"bye", 1);
    let relayed = engine.prepare_relay(&l).expect("leave floods");
    assert_eq!(relayed.ttl, 0);
    // The copy we forwarded reached its hop limit; nobody relays it on.
    assert!(engine.prepare_relay(&relayed).is_none());
}
