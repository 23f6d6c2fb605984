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

//! Engine configuration. All fields are fixed at construction.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Lower bound for the sync filter byte budget.
pub const MIN_FILTER_BYTES: usize = 128;
/// Upper bound for the sync filter byte budget.
pub const MAX_FILTER_BYTES: usize = 1024;

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `seen_capacity` must be nonzero.
    #[error("seen_capacity must be nonzero")]
    SeenCapacity,
    /// `gcs_max_bytes` outside 128..=1024.
    #[error("gcs_max_bytes out of range")]
    FilterBytes,
    /// `gcs_target_fpr` outside (0, 1).
    #[error("gcs_target_fpr out of range")]
    TargetFpr,
    /// `default_ttl` exceeds `max_ttl`.
    #[error("default_ttl exceeds max_ttl")]
    Ttl,
    /// `periodic_interval_ms` must be nonzero.
    #[error("periodic_interval_ms must be nonzero")]
    Interval,
    /// TOML parse failure.
    #[error("parse config")]
    Parse,
}

/// Gossip engine configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Seen-set capacity (broadcast messages retained for sync).
    pub seen_capacity: usize,
    /// Sync filter byte budget, 128..=1024.
    pub gcs_max_bytes: usize,
    /// Sync filter target false-positive rate, in (0, 1).
    pub gcs_target_fpr: f64,
    /// Period between broadcast sync requests, in milliseconds.
    pub periodic_interval_ms: u64,
    /// Delay before the one-shot sync to a freshly-linked peer.
    pub initial_sync_delay_ms: u64,
    /// Maximum accepted TTL on any packet.
    pub max_ttl: u8,
    /// TTL stamped on locally-originated flooded packets.
    pub default_ttl: u8,
    /// Oldest acceptable packet age when a verifier is injected.
    pub max_packet_age_ms: u64,
    /// Tolerated forward clock skew when a verifier is injected.
    pub clock_skew_tolerance_ms: u64,
    /// Capacity of the relay dedup window for non-message packet types.
    pub relay_dedup_capacity: usize,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            seen_capacity: 1000,
            gcs_max_bytes: 400,
            gcs_target_fpr: 0.01,
            periodic_interval_ms: 30_000,
            initial_sync_delay_ms: 5_000,
            max_ttl: 10,
            default_ttl: 5,
            max_packet_age_ms: 300_000,
            // 10s skew is usually safe across phones and laptops while
            // still bounding the replay window.
            clock_skew_tolerance_ms: 10_000,
            relay_dedup_capacity: 1000,
        }
    }
}

impl GossipConfig {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seen_capacity == 0 {
            return Err(ConfigError::SeenCapacity);
        }
        if !(MIN_FILTER_BYTES..=MAX_FILTER_BYTES).contains(&self.gcs_max_bytes) {
            return Err(ConfigError::FilterBytes);
        }
        if !(self.gcs_target_fpr > 0.0 && self.gcs_target_fpr < 1.0) {
            return Err(ConfigError::TargetFpr);
        }
        if self.default_ttl > self.max_ttl {
            return Err(ConfigError::Ttl);
        }
        if self.periodic_interval_ms == 0 {
            return Err(ConfigError::Interval);
        }
        Ok(())
    }

    /// Parse and validate from a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: GossipConfig = toml::from_str(raw).map_err(|_| ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Period between broadcast sync requests.
    pub fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }

    /// Delay before the one-shot sync to a freshly-linked peer.
    pub fn initial_sync_delay(&self) -> Duration {
        Duration::from_millis(self.initial_sync_delay_ms)
    }
}
