//! Cooldown-based view deduplication
//!
//! A view counts only if the same fingerprint has not viewed the same asset
//! within the cooldown window. The lookback includes its lower bound: an
//! earlier view at exactly `now - cooldown` still suppresses.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};

use crate::domain::{
    default_view_cooldown, AssetId, Fingerprint, RecordViewOutcome, ViewCommit, ViewEvent,
};
use crate::infra::{Result, ServiceError, ViewStore};
use crate::metrics::{metric_names, MetricsRegistry};

pub struct ViewDeduplicator {
    store: Arc<dyn ViewStore>,
    cooldown: Duration,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ViewDeduplicator {
    pub fn new(store: Arc<dyn ViewStore>) -> Self {
        Self {
            store,
            cooldown: default_view_cooldown(),
            metrics: None,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Record a view at `now`, counting it only outside the cooldown window.
    #[instrument(skip_all, fields(asset_id = %asset_id, fingerprint = %fingerprint))]
    pub async fn record_view(
        &self,
        asset_id: &AssetId,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<RecordViewOutcome> {
        let asset = self
            .store
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(asset_id.clone()))?;

        let window_start = now - self.cooldown;

        if let Some(previous) = self
            .store
            .latest_view_since(asset_id, fingerprint, window_start)
            .await?
        {
            debug!(previous_view = %previous.timestamp, "View within cooldown, not counted");
            self.count(metric_names::VIEWS_DUPLICATE);
            return Ok(RecordViewOutcome::duplicate(asset.views()));
        }

        let event = ViewEvent::new(asset_id.clone(), fingerprint.clone(), now);
        match self.store.commit_view(&event, window_start).await? {
            ViewCommit::Accepted { views } => {
                debug!(views, "View recorded");
                self.count(metric_names::VIEWS_RECORDED);
                Ok(RecordViewOutcome::accepted(views))
            }
            ViewCommit::Duplicate { views } => {
                debug!(views, "Concurrent view won the race, not counted");
                self.count(metric_names::VIEWS_DUPLICATE);
                Ok(RecordViewOutcome::duplicate(views))
            }
        }
    }

    /// Current denormalized view counter for an asset.
    pub async fn get_view_count(&self, asset_id: &AssetId) -> Result<u64> {
        self.store
            .get_asset(asset_id)
            .await?
            .map(|asset| asset.views())
            .ok_or_else(|| ServiceError::AssetNotFound(asset_id.clone()))
    }

    fn count(&self, name: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_counter(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Asset;
    use crate::infra::{MemoryStore, MockViewStore};
    use mockall::predicate::eq;

    async fn setup() -> (ViewDeduplicator, Arc<MemoryStore>, AssetId) {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");
        store.upsert_asset(&Asset::new(id.clone())).await.unwrap();
        (ViewDeduplicator::new(store.clone()), store, id)
    }

    #[tokio::test]
    async fn test_first_view_accepted_repeat_suppressed() {
        let (dedup, _, id) = setup().await;
        let fp = Fingerprint::user("42");
        let now = Utc::now();

        let first = dedup.record_view(&id, &fp, now).await.unwrap();
        let second = dedup
            .record_view(&id, &fp, now + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(first, RecordViewOutcome::accepted(1));
        assert_eq!(second, RecordViewOutcome::duplicate(1));
        assert_eq!(dedup.get_view_count(&id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_distinct_fingerprints_both_count() {
        let (dedup, _, id) = setup().await;
        let now = Utc::now();

        dedup.record_view(&id, &Fingerprint::user("42"), now).await.unwrap();
        let outcome = dedup
            .record_view(&id, &Fingerprint::ip("1.2.3.4"), now)
            .await
            .unwrap();

        assert_eq!(outcome, RecordViewOutcome::accepted(2));
    }

    #[tokio::test]
    async fn test_cooldown_boundary_is_inclusive() {
        let (dedup, _, id) = setup().await;
        let fp = Fingerprint::ip("10.0.0.1");
        let t0 = Utc::now();

        dedup.record_view(&id, &fp, t0).await.unwrap();

        let at_boundary = dedup
            .record_view(&id, &fp, t0 + dedup.cooldown())
            .await
            .unwrap();
        assert!(!at_boundary.accepted);

        let after = dedup
            .record_view(&id, &fp, t0 + dedup.cooldown() + Duration::milliseconds(1))
            .await
            .unwrap();
        assert_eq!(after, RecordViewOutcome::accepted(2));
    }

    #[tokio::test]
    async fn test_custom_cooldown() {
        let (dedup, _, id) = setup().await;
        let dedup = dedup.with_cooldown(Duration::seconds(10));
        let fp = Fingerprint::user("7");
        let t0 = Utc::now();

        dedup.record_view(&id, &fp, t0).await.unwrap();
        let outcome = dedup
            .record_view(&id, &fp, t0 + Duration::seconds(11))
            .await
            .unwrap();

        assert!(outcome.accepted);
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let (dedup, store, _) = setup().await;
        let missing = AssetId::new("missing");

        let err = dedup
            .record_view(&missing, &Fingerprint::user("1"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AssetNotFound(ref id) if *id == missing));
        assert!(matches!(
            dedup.get_view_count(&missing).await,
            Err(ServiceError::AssetNotFound(_))
        ));
        assert_eq!(store.view_event_count(&missing).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_write() {
        let id = AssetId::new("A1");
        let fp = Fingerprint::user("42");
        let now = Utc::now();

        let mut store = MockViewStore::new();
        let asset = Asset::new(id.clone()).with_views(3);
        store
            .expect_get_asset()
            .with(eq(id.clone()))
            .returning(move |_| Ok(Some(asset.clone())));
        let previous = ViewEvent::new(id.clone(), fp.clone(), now - Duration::minutes(1));
        store
            .expect_latest_view_since()
            .returning(move |_, _, _| Ok(Some(previous.clone())));
        store.expect_commit_view().never();

        let dedup = ViewDeduplicator::new(Arc::new(store));
        let outcome = dedup.record_view(&id, &fp, now).await.unwrap();

        assert_eq!(outcome, RecordViewOutcome::duplicate(3));
    }

    #[tokio::test]
    async fn test_persistence_error_surfaces() {
        let mut store = MockViewStore::new();
        store
            .expect_get_asset()
            .returning(|_| Err(ServiceError::Persistence(sqlx::Error::PoolTimedOut)));

        let dedup = ViewDeduplicator::new(Arc::new(store));
        let err = dedup
            .record_view(&AssetId::new("A1"), &Fingerprint::user("1"), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_metrics_counted() {
        let (dedup, _, id) = setup().await;
        let metrics = Arc::new(MetricsRegistry::new());
        let dedup = dedup.with_metrics(metrics.clone());
        let fp = Fingerprint::user("42");
        let now = Utc::now();

        dedup.record_view(&id, &fp, now).await.unwrap();
        dedup.record_view(&id, &fp, now).await.unwrap();

        assert_eq!(metrics.get_counter(metric_names::VIEWS_RECORDED), 1);
        assert_eq!(metrics.get_counter(metric_names::VIEWS_DUPLICATE), 1);
    }
}
