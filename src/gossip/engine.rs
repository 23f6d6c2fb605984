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

//! The gossip engine: periodic anti-entropy sync, the responder
//! algorithm, the observe path, TTL flood decisions, and peer lifecycle
//! hooks.
//!
//! The engine owns all gossip state behind one internal mutex and
//! delegates every send to the injected transport. No method blocks on
//! network I/O; `start`/`stop` only manipulate a local timer task.

use crate::core::config::GossipConfig;
use crate::core::gcs::{self, GcsFilter};
use crate::core::store::{Observation, PacketStore};
use crate::core::types::{Packet, PacketId, PacketType};
use crate::gossip::flood::RelayWindow;
use crate::gossip::transport::{PacketVerifier, TransportDelegate};
use crate::monitoring::metrics::Metrics;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use crate::core::config::ConfigError;

/// Snapshot of the engine's store sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineStats {
    /// Broadcast messages currently in the seen-set.
    pub seen_messages: usize,
    /// Senders with a stored announcement.
    pub announcements: usize,
}

struct EngineState {
    store: PacketStore,
    relay: RelayWindow,
}

/// Epidemic gossip engine with GCS anti-entropy.
pub struct GossipEngine {
    cfg: GossipConfig,
    local_id: Vec<u8>,
    delegate: Arc<dyn TransportDelegate>,
    verifier: Option<Arc<dyn PacketVerifier>>,
    metrics: Arc<Metrics>,
    state: Arc<Mutex<EngineState>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn lock_state(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build the sync filter over everything the node currently holds.
///
/// Candidates are all announcements plus all broadcast messages, newest
/// first; the count is capped by what the byte budget can represent.
fn build_sync_filter(store: &PacketStore, cfg: &GossipConfig) -> GcsFilter {
    let mut candidates: Vec<(u64, PacketId)> =
        Vec::with_capacity(store.announcements.len() + store.seen.len());
    for announce in store.announcements.iter() {
        candidates.push((announce.timestamp_ms, announce.id()));
    }
    for (id, msg) in store.seen.iter() {
        candidates.push((msg.timestamp_ms, *id));
    }
    candidates.sort_by(|a, b| b.0.cmp(&a.0));

    let p = gcs::derive_p(cfg.gcs_target_fpr);
    let take = candidates
        .len()
        .min(gcs::max_ids(cfg.gcs_max_bytes, p))
        .min(cfg.seen_capacity);
    if take == 0 {
        return GcsFilter::empty(p);
    }

    let ids: Vec<PacketId> = candidates.into_iter().take(take).map(|(_, id)| id).collect();
    GcsFilter::build(ids.iter(), cfg.gcs_max_bytes, cfg.gcs_target_fpr)
}

/// Build, sign, and send one REQUEST_SYNC.
///
/// Broadcast when `target` is absent; otherwise directed, with the
/// recipient set to the 8-byte prefix of the hex-decoded peer id. The
/// request is node-local (`ttl = 0`) and never flooded.
fn emit_sync_request(
    state: &Mutex<EngineState>,
    delegate: &Arc<dyn TransportDelegate>,
    metrics: &Metrics,
    cfg: &GossipConfig,
    local_id: &[u8],
    target: Option<&str>,
) {
    let filter = {
        let st = lock_state(state);
        build_sync_filter(&st.store, cfg)
    };

    let recipient_id = target.and_then(|peer| match hex::decode(peer) {
        Ok(bytes) if bytes.len() >= 8 => Some(bytes[..8].to_vec()),
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        _ => {
            warn!(peer = %peer, "peer id is not hex; falling back to broadcast sync");
            None
        }
    });

    let packet = Packet {
        packet_type: PacketType::RequestSync,
        sender_id: local_id.to_vec(),
        recipient_id,
        timestamp_ms: now_ms(),
        payload: filter.encode(),
        signature: None,
        ttl: 0,
    };
    let packet = delegate.sign_for_broadcast(packet);

    let sent = match target {
        Some(peer) => delegate.send_to_peer(peer, &packet),
        None => delegate.send_broadcast(&packet),
    };
    if let Err(err) = sent {
        warn!(err = %err, "sync request send failed");
    }
    metrics.sync_requests_sent_total.inc();
}

impl GossipEngine {
    /// Create an engine. `local_id` is this node's sender identity.
    pub fn new(
        local_id: Vec<u8>,
        cfg: GossipConfig,
        delegate: Arc<dyn TransportDelegate>,
        metrics: Arc<Metrics>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let state = EngineState {
            store: PacketStore::new(cfg.seen_capacity),
            relay: RelayWindow::new(cfg.relay_dedup_capacity),
        };
        Ok(Self {
            cfg,
            local_id,
            delegate,
            verifier: None,
            metrics,
            state: Arc::new(Mutex::new(state)),
            timer: Mutex::new(None),
        })
    }

    /// Inject an inbound packet verifier; enables the timestamp
    /// acceptance window on the observe path.
    pub fn with_verifier(mut self, verifier: Arc<dyn PacketVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Begin the periodic sync timer. Idempotent; must be called from
    /// within a tokio runtime. The first request is emitted one full
    /// interval after start.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            return;
        }
        let state = Arc::clone(&self.state);
        let delegate = Arc::clone(&self.delegate);
        let metrics = Arc::clone(&self.metrics);
        let cfg = self.cfg.clone();
        let local_id = self.local_id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(cfg.periodic_interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; consume it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                emit_sync_request(&state, &delegate, &metrics, &cfg, &local_id, None);
            }
        });
        *timer = Some(handle);
        info!(interval_ms = self.cfg.periodic_interval_ms, "gossip engine started");
    }

    /// Cancel the periodic timer. Idempotent and synchronous; buffers
    /// are not drained and in-flight delegate sends are not cancelled.
    pub fn stop(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
            info!("gossip engine stopped");
        }
    }

    /// Whether the periodic timer is running.
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// One-shot: after `delay`, send a directed REQUEST_SYNC built from
    /// the state at that moment. Fire-and-forget; there is no cancel.
    pub fn schedule_initial_sync_to_peer(&self, peer_id: &str, delay: Duration) {
        let state = Arc::clone(&self.state);
        let delegate = Arc::clone(&self.delegate);
        let metrics = Arc::clone(&self.metrics);
        let cfg = self.cfg.clone();
        let local_id = self.local_id.clone();
        let peer = peer_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(peer = %peer, "initial sync");
            emit_sync_request(&state, &delegate, &metrics, &cfg, &local_id, Some(peer.as_str()));
        });
    }

    /// Peer-link hook: schedule the initial sync after the configured
    /// delay.
    pub fn on_peer_connected(&self, peer_id: &str) {
        self.schedule_initial_sync_to_peer(peer_id, self.cfg.initial_sync_delay());
    }

    /// Observe one inbound public packet.
    ///
    /// Validates, optionally verifies, then classifies into the stores.
    /// Never raises; malformed input is dropped and logged. The returned
    /// [`Observation`] tells the embedder whether to deliver locally
    /// (`NewMessage`) or suppress a duplicate.
    pub fn on_public_packet_seen(&self, packet: Packet) -> Observation {
        if let Err(err) = packet.validate(self.cfg.max_ttl) {
            debug!(err = %err, sender = %packet.sender_hex(), "dropping invalid packet");
            self.metrics.invalid_packets_total.inc();
            return Observation::Ignored;
        }
        if !self.admitted(&packet) {
            return Observation::Ignored;
        }
        self.observe_admitted(packet)
    }

    /// Answer an incoming REQUEST_SYNC.
    ///
    /// Decodes the requester's filter and sends every stored packet
    /// whose ID is not possibly in it: announcements first (sender-key
    /// order), then broadcast messages in insertion order, each with
    /// `ttl = 0`. All sends complete before this returns. A malformed
    /// payload yields an empty reconciliation.
    pub fn handle_request_sync(&self, from_peer: &str, payload: &[u8]) {
        let filter = match GcsFilter::decode(payload) {
            Ok(f) => f,
            Err(err) => {
                warn!(peer = %from_peer, err = %err, "malformed sync request");
                self.metrics.malformed_sync_total.inc();
                return;
            }
        };
        let buckets = filter.to_bucket_set();

        let missing: Vec<Packet> = {
            let st = lock_state(&self.state);
            let mut out = Vec::new();
            for announce in st.store.announcements.iter() {
                if !buckets.contains_id(&announce.id()) {
                    let mut copy = announce.clone();
                    copy.ttl = 0;
                    out.push(copy);
                }
            }
            for (id, msg) in st.store.seen.iter() {
                if !buckets.contains_id(id) {
                    let mut copy = msg.clone();
                    copy.ttl = 0;
                    out.push(copy);
                }
            }
            out
        };

        // Sends happen outside the state lock so a delegate may call
        // back into the engine.
        for packet in missing {
            if let Err(err) = self.delegate.send_to_peer(from_peer, &packet) {
                warn!(peer = %from_peer, err = %err, "sync response send failed");
            }
            self.metrics.sync_responses_sent_total.inc();
        }
    }

    /// LEAVE / disconnect hook: drop the peer's announcement and every
    /// seen-set packet it sent (hex id, case-insensitive).
    pub fn remove_announcement_for_peer(&self, peer_id: &str) {
        let (removed, purged) = {
            let mut st = lock_state(&self.state);
            let result = st.store.remove_peer(peer_id);
            self.metrics
                .announcements
                .set(st.store.announcements.len() as i64);
            self.metrics.seen_packets.set(st.store.seen.len() as i64);
            result
        };
        if removed || purged > 0 {
            info!(peer = %peer_id, purged, "purged departed peer");
        }
    }

    /// Decide whether a received packet should be flooded onward.
    ///
    /// Never relays REQUEST_SYNC or anything with `ttl == 0`. Broadcast
    /// messages are gated on seen-set membership, every other type on
    /// the bounded relay window. The returned copy has its TTL
    /// decremented. Consult this *before* [`Self::on_public_packet_seen`]
    /// for the same arrival, or use [`Self::ingest_public_packet`].
    pub fn prepare_relay(&self, packet: &Packet) -> Option<Packet> {
        if packet.packet_type == PacketType::RequestSync || packet.ttl == 0 {
            return None;
        }
        if packet.validate(self.cfg.max_ttl).is_err() {
            return None;
        }
        let id = packet.id();
        let fresh = {
            let mut st = lock_state(&self.state);
            match packet.packet_type {
                PacketType::Message if packet.is_broadcast() => !st.store.seen.contains(&id),
                _ => st.relay.first_sighting(id),
            }
        };
        if !fresh {
            return None;
        }
        let mut copy = packet.clone();
        copy.ttl -= 1;
        self.metrics.relayed_total.inc();
        Some(copy)
    }

    /// Combined inbound path: relay decision, then observe.
    pub fn ingest_public_packet(&self, packet: Packet) -> (Observation, Option<Packet>) {
        if let Err(err) = packet.validate(self.cfg.max_ttl) {
            debug!(err = %err, sender = %packet.sender_hex(), "dropping invalid packet");
            self.metrics.invalid_packets_total.inc();
            return (Observation::Ignored, None);
        }
        if !self.admitted(&packet) {
            return (Observation::Ignored, None);
        }
        let relay = self.prepare_relay(&packet);
        let obs = self.observe_admitted(packet);
        (obs, relay)
    }

    /// Store sizes.
    pub fn stats(&self) -> EngineStats {
        let st = lock_state(&self.state);
        EngineStats {
            seen_messages: st.store.seen.len(),
            announcements: st.store.announcements.len(),
        }
    }

    /// Seen-set IDs in insertion order.
    pub fn seen_ids(&self) -> Vec<PacketId> {
        lock_state(&self.state).store.seen.ids()
    }

    /// Whether a broadcast message ID is in the seen-set.
    pub fn contains_message(&self, id: &PacketId) -> bool {
        lock_state(&self.state).store.seen.contains(id)
    }

    /// Senders with a stored announcement, in map order.
    pub fn announcement_senders(&self) -> Vec<String> {
        lock_state(&self.state).store.announcements.senders()
    }

    /// Latest announcement for a sender, if any.
    pub fn announcement_for(&self, peer_id: &str) -> Option<Packet> {
        lock_state(&self.state)
            .store
            .announcements
            .get(peer_id)
            .cloned()
    }

    fn admitted(&self, packet: &Packet) -> bool {
        let Some(verifier) = &self.verifier else {
            return true;
        };
        if let Err(err) = packet.fresh_at(
            now_ms(),
            self.cfg.max_packet_age_ms,
            self.cfg.clock_skew_tolerance_ms,
        ) {
            debug!(err = %err, sender = %packet.sender_hex(), "dropping stale packet");
            self.metrics.invalid_packets_total.inc();
            return false;
        }
        if !verifier.verify(packet) {
            warn!(sender = %packet.sender_hex(), "dropping packet with bad signature");
            self.metrics.invalid_packets_total.inc();
            return false;
        }
        true
    }

    fn observe_admitted(&self, packet: Packet) -> Observation {
        let mut st = lock_state(&self.state);
        let (obs, evicted) = st.store.observe(packet);
        match obs {
            Observation::NewMessage => {
                self.metrics.packets_observed_total.inc();
                if evicted.is_some() {
                    self.metrics.seen_evicted_total.inc();
                }
                self.metrics.seen_packets.set(st.store.seen.len() as i64);
            }
            Observation::DuplicateMessage => {
                self.metrics.duplicates_dropped_total.inc();
            }
            Observation::AnnouncementStored | Observation::AnnouncementReplaced => {
                self.metrics.packets_observed_total.inc();
                self.metrics
                    .announcements
                    .set(st.store.announcements.len() as i64);
            }
            Observation::Ignored => {}
        }
        obs
    }
}

impl Drop for GossipEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
