//! PostgreSQL view store
//!
//! `commit_view` locks the asset row with `SELECT ... FOR UPDATE`, re-checks
//! the cooldown window inside the lock, then bumps `analytics.views` and
//! inserts the view event in the same transaction. Two concurrent requests
//! for the same fingerprint therefore serialize on the asset row and only one
//! of them is counted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, FromRow};
use uuid::Uuid;

use crate::domain::{Asset, AssetAnalytics, AssetId, Fingerprint, ViewCommit, ViewEvent};
use crate::infra::{Result, ServiceError, ViewStore};

#[derive(FromRow)]
struct AssetRow {
    id: String,
    analytics: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for Asset {
    type Error = ServiceError;

    fn try_from(row: AssetRow) -> Result<Self> {
        Ok(Asset {
            id: AssetId(row.id),
            analytics: AssetAnalytics::from_json(row.analytics.unwrap_or_default())?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ViewRow {
    id: Uuid,
    asset_id: String,
    fingerprint: String,
    user_id: Option<String>,
    timestamp: DateTime<Utc>,
}

impl TryFrom<ViewRow> for ViewEvent {
    type Error = ServiceError;

    fn try_from(row: ViewRow) -> Result<Self> {
        let fingerprint = Fingerprint::parse(row.fingerprint).ok_or_else(|| {
            ServiceError::Internal(format!("view {} has an empty fingerprint", row.id))
        })?;
        Ok(ViewEvent {
            id: row.id,
            asset_id: AssetId(row.asset_id),
            fingerprint,
            user_id: row.user_id,
            timestamp: row.timestamp,
        })
    }
}

/// PostgreSQL-backed `ViewStore`
pub struct PgViewStore {
    pool: PgPool,
}

impl PgViewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ViewStore for PgViewStore {
    async fn get_asset(&self, asset_id: &AssetId) -> Result<Option<Asset>> {
        let row: Option<AssetRow> = sqlx::query_as(
            r#"
            SELECT id, analytics, created_at
            FROM assets
            WHERE id = $1
            "#,
        )
        .bind(asset_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Asset::try_from).transpose()
    }

    async fn upsert_asset(&self, asset: &Asset) -> Result<()> {
        let analytics = serde_json::to_value(&asset.analytics)?;
        sqlx::query(
            r#"
            INSERT INTO assets (id, analytics, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET analytics = EXCLUDED.analytics
            "#,
        )
        .bind(asset.id.as_str())
        .bind(analytics)
        .bind(asset.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn latest_view_since(
        &self,
        asset_id: &AssetId,
        fingerprint: &Fingerprint,
        since: DateTime<Utc>,
    ) -> Result<Option<ViewEvent>> {
        let row: Option<ViewRow> = sqlx::query_as(
            r#"
            SELECT id, asset_id, fingerprint, user_id, timestamp
            FROM asset_views
            WHERE asset_id = $1 AND fingerprint = $2 AND timestamp >= $3
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(asset_id.as_str())
        .bind(fingerprint.as_str())
        .bind(since)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ViewEvent::try_from).transpose()
    }

    async fn commit_view(
        &self,
        event: &ViewEvent,
        window_start: DateTime<Utc>,
    ) -> Result<ViewCommit> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(Option<serde_json::Value>,)> = sqlx::query_as(
            r#"
            SELECT analytics
            FROM assets
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(event.asset_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((analytics,)) = locked else {
            return Err(ServiceError::AssetNotFound(event.asset_id.clone()));
        };
        let current = AssetAnalytics::from_json(analytics.unwrap_or_default())?.views;

        let recent: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id
            FROM asset_views
            WHERE asset_id = $1 AND fingerprint = $2 AND timestamp >= $3
            LIMIT 1
            "#,
        )
        .bind(event.asset_id.as_str())
        .bind(event.fingerprint.as_str())
        .bind(window_start)
        .fetch_optional(&mut *tx)
        .await?;

        if recent.is_some() {
            tx.rollback().await?;
            return Ok(ViewCommit::Duplicate { views: current });
        }

        let (views,): (i64,) = sqlx::query_as(
            r#"
            UPDATE assets
            SET analytics = jsonb_set(
                COALESCE(analytics, '{}'::jsonb),
                '{views}',
                to_jsonb(COALESCE((analytics->>'views')::bigint, 0) + 1)
            )
            WHERE id = $1
            RETURNING (analytics->>'views')::bigint
            "#,
        )
        .bind(event.asset_id.as_str())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO asset_views (id, asset_id, fingerprint, user_id, timestamp)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id)
        .bind(event.asset_id.as_str())
        .bind(event.fingerprint.as_str())
        .bind(event.user_id.as_deref())
        .bind(event.timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ViewCommit::Accepted {
            views: views.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
