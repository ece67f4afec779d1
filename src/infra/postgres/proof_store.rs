//! PostgreSQL proof store
//!
//! `view_proofs` carries a unique constraint on `(asset_id, view_count)`;
//! inserts use `ON CONFLICT DO NOTHING` and fall back to reading the row that
//! won, so concurrent issuers for the same count converge on one proof.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{AssetId, ProofInsert, ProofPayload, ProofRecord};
use crate::infra::{ProofStore, Result, ServiceError};

#[derive(FromRow)]
struct ProofRow {
    id: Uuid,
    asset_id: String,
    view_count: i64,
    proof: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl From<ProofRow> for ProofRecord {
    fn from(row: ProofRow) -> Self {
        ProofRecord {
            id: row.id,
            asset_id: AssetId(row.asset_id),
            view_count: row.view_count.max(0) as u64,
            proof: ProofPayload::from_json(row.proof),
            timestamp: row.timestamp,
        }
    }
}

fn db_view_count(view_count: u64) -> Result<i64> {
    i64::try_from(view_count)
        .map_err(|_| ServiceError::InvalidInput(format!("view count {view_count} out of range")))
}

/// PostgreSQL-backed `ProofStore`
pub struct PgProofStore {
    pool: PgPool,
}

impl PgProofStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProofStore for PgProofStore {
    async fn find_proof(
        &self,
        asset_id: &AssetId,
        view_count: u64,
    ) -> Result<Option<ProofRecord>> {
        let row: Option<ProofRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, view_count, proof, timestamp
            FROM view_proofs
            WHERE asset_id = $1 AND view_count = $2
            "#,
        )
        .bind(asset_id.as_str())
        .bind(db_view_count(view_count)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProofRecord::from))
    }

    async fn save_proof(
        &self,
        asset_id: &AssetId,
        view_count: u64,
        proof: ProofPayload,
    ) -> Result<ProofInsert> {
        let inserted: Option<ProofRow> = sqlx::query_as(
            r#"
            INSERT INTO view_proofs (id, asset_id, view_count, proof, timestamp)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (asset_id, view_count) DO NOTHING
            RETURNING id, asset_id, view_count, proof, timestamp
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(asset_id.as_str())
        .bind(db_view_count(view_count)?)
        .bind(proof.to_json())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(ProofInsert::Created(row.into()));
        }

        self.find_proof(asset_id, view_count)
            .await?
            .map(ProofInsert::Existing)
            .ok_or_else(|| {
                ServiceError::Internal(format!(
                    "proof for {asset_id}/{view_count} conflicted but could not be read back"
                ))
            })
    }

    async fn latest_proof(&self, asset_id: &AssetId) -> Result<Option<ProofRecord>> {
        let row: Option<ProofRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, view_count, proof, timestamp
            FROM view_proofs
            WHERE asset_id = $1
            ORDER BY timestamp DESC, view_count DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProofRecord::from))
    }

    async fn list_recent_proofs(
        &self,
        asset_id: &AssetId,
        limit: u32,
    ) -> Result<Vec<ProofRecord>> {
        let rows: Vec<ProofRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, view_count, proof, timestamp
            FROM view_proofs
            WHERE asset_id = $1
            ORDER BY timestamp DESC, view_count DESC
            LIMIT $2
            "#,
        )
        .bind(asset_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProofRecord::from).collect())
    }
}
