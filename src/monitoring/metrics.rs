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

use prometheus::{IntCounter, IntGauge, Registry};
use thiserror::Error;

/// Metrics errors.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus")]
    Prom,
}

/// Metrics container for the gossip plane.
#[derive(Clone)]
pub struct Metrics {
    /// Registry.
    pub registry: Registry,

    /// Broadcast messages currently in the seen-set.
    pub seen_packets: IntGauge,
    /// Senders with a stored announcement.
    pub announcements: IntGauge,

    /// Packets accepted into the stores.
    pub packets_observed_total: IntCounter,
    /// Duplicate broadcast messages dropped.
    pub duplicates_dropped_total: IntCounter,
    /// Packets dropped for failing validation or verification.
    pub invalid_packets_total: IntCounter,
    /// Seen-set entries evicted at capacity.
    pub seen_evicted_total: IntCounter,
    /// Sync requests emitted (periodic + initial).
    pub sync_requests_sent_total: IntCounter,
    /// Packets sent in response to sync requests.
    pub sync_responses_sent_total: IntCounter,
    /// Sync requests dropped as malformed.
    pub malformed_sync_total: IntCounter,
    /// Packets approved for onward flooding.
    pub relayed_total: IntCounter,
}

impl Metrics {
    /// Create and register metrics.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let seen_packets = IntGauge::new("driftmesh_seen_packets", "Seen-set size")
            .map_err(|_| MetricsError::Prom)?;
        let announcements = IntGauge::new("driftmesh_announcements", "Announcement map size")
            .map_err(|_| MetricsError::Prom)?;

        let packets_observed_total = IntCounter::new(
            "driftmesh_packets_observed_total",
            "Packets accepted into the stores",
        )
        .map_err(|_| MetricsError::Prom)?;
        let duplicates_dropped_total = IntCounter::new(
            "driftmesh_duplicates_dropped_total",
            "Duplicate broadcast messages dropped",
        )
        .map_err(|_| MetricsError::Prom)?;
        let invalid_packets_total = IntCounter::new(
            "driftmesh_invalid_packets_total",
            "Packets dropped for failing validation or verification",
        )
        .map_err(|_| MetricsError::Prom)?;
        let seen_evicted_total = IntCounter::new(
            "driftmesh_seen_evicted_total",
            "Seen-set entries evicted at capacity",
        )
        .map_err(|_| MetricsError::Prom)?;
        let sync_requests_sent_total = IntCounter::new(
            "driftmesh_sync_requests_sent_total",
            "Sync requests emitted",
        )
        .map_err(|_| MetricsError::Prom)?;
        let sync_responses_sent_total = IntCounter::new(
            "driftmesh_sync_responses_sent_total",
            "Packets sent in response to sync requests",
        )
        .map_err(|_| MetricsError::Prom)?;
        let malformed_sync_total = IntCounter::new(
            "driftmesh_malformed_sync_total",
            "Sync requests dropped as malformed",
        )
        .map_err(|_| MetricsError::Prom)?;
        let relayed_total = IntCounter::new(
            "driftmesh_relayed_total",
            "Packets approved for onward flooding",
        )
        .map_err(|_| MetricsError::Prom)?;

        registry
            .register(Box::new(seen_packets.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(announcements.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(packets_observed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(duplicates_dropped_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(invalid_packets_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(seen_evicted_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sync_requests_sent_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(sync_responses_sent_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(malformed_sync_total.clone()))
            .map_err(|_| MetricsError::Prom)?;
        registry
            .register(Box::new(relayed_total.clone()))
            .map_err(|_| MetricsError::Prom)?;

        Ok(Self {
            registry,
            seen_packets,
            announcements,
            packets_observed_total,
            duplicates_dropped_total,
            invalid_packets_total,
            seen_evicted_total,
            sync_requests_sent_total,
            sync_responses_sent_total,
            malformed_sync_total,
            relayed_total,
        })
    }
}
