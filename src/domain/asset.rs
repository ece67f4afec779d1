//! Assets and view events.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssetId, Fingerprint};

/// Default cooldown during which repeat views from one fingerprint are ignored.
pub const DEFAULT_VIEW_COOLDOWN_SECS: i64 = 60 * 60;

pub fn default_view_cooldown() -> Duration {
    Duration::seconds(DEFAULT_VIEW_COOLDOWN_SECS)
}

/// Denormalized analytics stored alongside an asset.
///
/// Only `views` is owned by this service; any other keys (creator/owner
/// metadata) are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetAnalytics {
    #[serde(default, deserialize_with = "lenient_views")]
    pub views: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AssetAnalytics {
    /// Parse a stored analytics blob. `null` and missing `views` read as zero.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
    }
}

/// `views` as other writers leave it: `null` reads as zero and integral
/// floats (`3.0`) as their integer value.
fn lenient_views<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<serde_json::Number>::deserialize(deserializer)? {
        None => Ok(0),
        Some(n) => {
            if let Some(v) = n.as_u64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => Ok(f as u64),
                _ => Err(D::Error::custom(format!(
                    "views must be a non-negative integer, got {n}"
                ))),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub analytics: AssetAnalytics,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(id: AssetId) -> Self {
        Self {
            id,
            analytics: AssetAnalytics::default(),
            created_at: Utc::now(),
        }
    }

    pub fn with_views(mut self, views: u64) -> Self {
        self.analytics.views = views;
        self
    }

    pub fn views(&self) -> u64 {
        self.analytics.views
    }
}

/// A single accepted view. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub id: Uuid,
    pub asset_id: AssetId,
    pub fingerprint: Fingerprint,
    pub user_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ViewEvent {
    pub fn new(asset_id: AssetId, fingerprint: Fingerprint, timestamp: DateTime<Utc>) -> Self {
        let user_id = fingerprint.user_id().map(str::to_string);
        Self {
            id: Uuid::new_v4(),
            asset_id,
            fingerprint,
            user_id,
            timestamp,
        }
    }
}

/// Result of `record_view`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordViewOutcome {
    pub accepted: bool,
    pub views: u64,
}

impl RecordViewOutcome {
    pub fn accepted(views: u64) -> Self {
        Self {
            accepted: true,
            views,
        }
    }

    pub fn duplicate(views: u64) -> Self {
        Self {
            accepted: false,
            views,
        }
    }
}

/// What the store did with a view it was asked to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommit {
    /// Counter incremented and event inserted.
    Accepted { views: u64 },
    /// A concurrent request for the same fingerprint committed first.
    Duplicate { views: u64 },
}
