//! Trait definitions for the view proof service's storage and collaborators

use async_trait::async_trait;
use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    Asset, AssetId, Fingerprint, OnchainProof, ProofInsert, ProofPayload, ProofRecord, ViewCommit,
    ViewEvent, ZkFetchRequest, ZkProof,
};

use super::Result;

/// Persistence for assets, their denormalized view counters, and view events.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Load an asset by id
    async fn get_asset(&self, asset_id: &AssetId) -> Result<Option<Asset>>;

    /// Insert or replace an asset (seeding and tests)
    async fn upsert_asset(&self, asset: &Asset) -> Result<()>;

    /// Most recent view for `(asset_id, fingerprint)` with `timestamp >= since`
    async fn latest_view_since(
        &self,
        asset_id: &AssetId,
        fingerprint: &Fingerprint,
        since: DateTime<Utc>,
    ) -> Result<Option<ViewEvent>>;

    /// Increment the asset's counter and insert `event` as one unit.
    ///
    /// Re-checks for a view newer than `window_start` under the store's lock
    /// and reports `ViewCommit::Duplicate` without writing when one exists.
    /// Fails with `AssetNotFound` when the asset is missing.
    async fn commit_view(&self, event: &ViewEvent, window_start: DateTime<Utc>)
        -> Result<ViewCommit>;

    /// Connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}

/// Idempotent persistence of proofs keyed by `(asset_id, view_count)`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProofStore: Send + Sync {
    /// Find the proof for an exact view count
    async fn find_proof(&self, asset_id: &AssetId, view_count: u64)
        -> Result<Option<ProofRecord>>;

    /// Insert a proof unless one already exists for `(asset_id, view_count)`
    async fn save_proof(
        &self,
        asset_id: &AssetId,
        view_count: u64,
        proof: ProofPayload,
    ) -> Result<ProofInsert>;

    /// Most recently written proof for an asset
    async fn latest_proof(&self, asset_id: &AssetId) -> Result<Option<ProofRecord>>;

    /// Latest `limit` proofs for an asset, newest first
    async fn list_recent_proofs(&self, asset_id: &AssetId, limit: u32)
        -> Result<Vec<ProofRecord>>;
}

/// External zero-knowledge proof service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ZkProver: Send + Sync {
    /// Ask the prover to fetch `request.url` and attest to the extracted value.
    ///
    /// `Ok(None)` means the service answered but produced no proof.
    async fn zk_fetch(&self, request: &ZkFetchRequest) -> Result<Option<ZkProof>>;
}

/// Independent verification of prover output.
#[cfg_attr(test, automock)]
pub trait ProofVerifier: Send + Sync {
    /// Whether the proof's claim and witness signatures check out
    fn verify(&self, proof: &ZkProof) -> bool;

    /// Reshape a verified proof for on-chain submission
    fn transform_for_onchain(&self, proof: &ZkProof) -> OnchainProof;
}

/// Direct read of the public view-count endpoint.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ViewCountReader: Send + Sync {
    /// Fetch `url` and return the `views` it reports
    async fn read_views(&self, url: &str) -> Result<u64>;
}
