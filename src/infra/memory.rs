//! In-memory store for local development and tests
//!
//! Implements both `ViewStore` and `ProofStore` behind a single mutex, so the
//! cooldown re-check, counter increment, and event insert in `commit_view`
//! happen as one step, and proof inserts are idempotent per
//! `(asset_id, view_count)`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    Asset, AssetId, Fingerprint, ProofInsert, ProofPayload, ProofRecord, ViewCommit, ViewEvent,
};

use super::{ProofStore, Result, ServiceError, ViewStore};

#[derive(Default)]
struct Inner {
    assets: HashMap<AssetId, Asset>,
    views: Vec<ViewEvent>,
    proofs: Vec<ProofRecord>,
}

impl Inner {
    fn latest_view_since(
        &self,
        asset_id: &AssetId,
        fingerprint: &Fingerprint,
        since: DateTime<Utc>,
    ) -> Option<&ViewEvent> {
        self.views
            .iter()
            .filter(|v| &v.asset_id == asset_id && &v.fingerprint == fingerprint)
            .filter(|v| v.timestamp >= since)
            .max_by_key(|v| v.timestamp)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored view events for an asset
    pub async fn view_event_count(&self, asset_id: &AssetId) -> usize {
        let inner = self.inner.lock().await;
        inner.views.iter().filter(|v| &v.asset_id == asset_id).count()
    }

    /// Number of stored proofs for an asset
    pub async fn proof_count(&self, asset_id: &AssetId) -> usize {
        let inner = self.inner.lock().await;
        inner.proofs.iter().filter(|p| &p.asset_id == asset_id).count()
    }
}

#[async_trait]
impl ViewStore for MemoryStore {
    async fn get_asset(&self, asset_id: &AssetId) -> Result<Option<Asset>> {
        Ok(self.inner.lock().await.assets.get(asset_id).cloned())
    }

    async fn upsert_asset(&self, asset: &Asset) -> Result<()> {
        self.inner
            .lock()
            .await
            .assets
            .insert(asset.id.clone(), asset.clone());
        Ok(())
    }

    async fn latest_view_since(
        &self,
        asset_id: &AssetId,
        fingerprint: &Fingerprint,
        since: DateTime<Utc>,
    ) -> Result<Option<ViewEvent>> {
        let inner = self.inner.lock().await;
        Ok(inner.latest_view_since(asset_id, fingerprint, since).cloned())
    }

    async fn commit_view(
        &self,
        event: &ViewEvent,
        window_start: DateTime<Utc>,
    ) -> Result<ViewCommit> {
        let mut inner = self.inner.lock().await;

        let current = inner
            .assets
            .get(&event.asset_id)
            .map(Asset::views)
            .ok_or_else(|| ServiceError::AssetNotFound(event.asset_id.clone()))?;

        if inner
            .latest_view_since(&event.asset_id, &event.fingerprint, window_start)
            .is_some()
        {
            return Ok(ViewCommit::Duplicate { views: current });
        }

        let views = current.saturating_add(1);
        if let Some(asset) = inner.assets.get_mut(&event.asset_id) {
            asset.analytics.views = views;
        }
        inner.views.push(event.clone());

        Ok(ViewCommit::Accepted { views })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl ProofStore for MemoryStore {
    async fn find_proof(
        &self,
        asset_id: &AssetId,
        view_count: u64,
    ) -> Result<Option<ProofRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .proofs
            .iter()
            .find(|p| &p.asset_id == asset_id && p.view_count == view_count)
            .cloned())
    }

    async fn save_proof(
        &self,
        asset_id: &AssetId,
        view_count: u64,
        proof: ProofPayload,
    ) -> Result<ProofInsert> {
        let mut inner = self.inner.lock().await;

        if let Some(existing) = inner
            .proofs
            .iter()
            .find(|p| &p.asset_id == asset_id && p.view_count == view_count)
        {
            return Ok(ProofInsert::Existing(existing.clone()));
        }

        let record = ProofRecord {
            id: Uuid::new_v4(),
            asset_id: asset_id.clone(),
            view_count,
            proof,
            timestamp: Utc::now(),
        };
        inner.proofs.push(record.clone());
        Ok(ProofInsert::Created(record))
    }

    async fn latest_proof(&self, asset_id: &AssetId) -> Result<Option<ProofRecord>> {
        let inner = self.inner.lock().await;
        // max_by_key keeps the last maximum, so later inserts win timestamp ties.
        Ok(inner
            .proofs
            .iter()
            .filter(|p| &p.asset_id == asset_id)
            .max_by_key(|p| p.timestamp)
            .cloned())
    }

    async fn list_recent_proofs(
        &self,
        asset_id: &AssetId,
        limit: u32,
    ) -> Result<Vec<ProofRecord>> {
        let inner = self.inner.lock().await;
        let mut proofs: Vec<ProofRecord> = inner
            .proofs
            .iter()
            .filter(|p| &p.asset_id == asset_id)
            .cloned()
            .collect();
        proofs.reverse();
        proofs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        proofs.truncate(limit as usize);
        Ok(proofs)
    }
}
