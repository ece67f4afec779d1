//! Proof generation statistics snapshot types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AssetId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetProofStats {
    pub asset_id: AssetId,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub last_successful: Option<DateTime<Utc>>,
}

impl AssetProofStats {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            attempts: 0,
            successes: 0,
            failures: 0,
            last_successful: None,
        }
    }
}

/// Point-in-time copy of the process-wide proof statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofGenerationStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub asset_stats: BTreeMap<AssetId, AssetProofStats>,
    pub last_updated: DateTime<Utc>,
}

impl ProofGenerationStats {
    pub fn asset(&self, asset_id: &AssetId) -> Option<&AssetProofStats> {
        self.asset_stats.get(asset_id)
    }
}
