//! Process-wide proof generation statistics
//!
//! Global counters are plain atomics; per-asset entries live in a `DashMap`
//! and are updated under the entry's shard lock, so concurrent `record` calls
//! for the same asset never lose an increment.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;

use crate::domain::{AssetId, AssetProofStats, ProofGenerationStats};

pub struct ProofStatsTracker {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    asset_stats: DashMap<AssetId, AssetProofStats>,
    last_updated_ms: AtomicI64,
}

impl ProofStatsTracker {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            asset_stats: DashMap::new(),
            last_updated_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    /// Record one proof attempt for `asset_id`.
    pub fn record(&self, asset_id: &AssetId, success: bool) {
        self.record_at(asset_id, success, Utc::now());
    }

    pub fn record_at(&self, asset_id: &AssetId, success: bool, now: DateTime<Utc>) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }

        {
            let mut entry = self
                .asset_stats
                .entry(asset_id.clone())
                .or_insert_with(|| AssetProofStats::new(asset_id.clone()));
            entry.attempts += 1;
            if success {
                entry.successes += 1;
                entry.last_successful = Some(now);
            } else {
                entry.failures += 1;
            }
        }

        self.last_updated_ms
            .fetch_max(now.timestamp_millis(), Ordering::Relaxed);
    }

    /// Read-only copy for reporting.
    pub fn snapshot(&self) -> ProofGenerationStats {
        let asset_stats = self
            .asset_stats
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let last_updated = Utc
            .timestamp_millis_opt(self.last_updated_ms.load(Ordering::Relaxed))
            .single()
            .unwrap_or_else(Utc::now);

        ProofGenerationStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            asset_stats,
            last_updated,
        }
    }

    /// Assets with at least one successful attempt, in id order.
    pub fn assets_with_successes(&self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self
            .asset_stats
            .iter()
            .filter(|entry| entry.successes > 0)
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }
}

impl Default for ProofStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}
