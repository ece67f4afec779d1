//! Scheduled reconciliation of proof statistics against stored proofs
//!
//! For every asset with at least one successful proof attempt, the job
//! compares the live view counter with the newest stored proof and writes a
//! simple-verification snapshot when the counter has moved past it. Each
//! asset is processed on its own: a failure is retried on transient database
//! errors, then logged, and the remaining assets still run.
//!
//! # Configuration
//!
//! - `PROOF_STATS_INTERVAL_SECS` - Reconciliation period (default: 3600)

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::domain::{AssetId, ProofPayload, SimpleVerification, VerificationSource};
use crate::infra::{ProofStore, Result, Retry, RetryConfig, ServiceError, ViewStore};
use crate::metrics::{metric_names, MetricsRegistry};

use super::ProofStatsTracker;

/// Default reconciliation period.
pub const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Assets with at least one successful attempt
    pub examined: usize,
    /// Snapshots written
    pub created: usize,
    /// Assets already covered by a stored proof
    pub skipped: usize,
    /// Assets that failed after retries
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetOutcome {
    Created,
    Skipped,
}

pub struct ProofStatsPersister {
    stats: Arc<ProofStatsTracker>,
    views: Arc<dyn ViewStore>,
    proofs: Arc<dyn ProofStore>,
    retry: RetryConfig,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl ProofStatsPersister {
    pub fn new(
        stats: Arc<ProofStatsTracker>,
        views: Arc<dyn ViewStore>,
        proofs: Arc<dyn ProofStore>,
    ) -> Self {
        Self {
            stats,
            views,
            proofs,
            retry: RetryConfig::database(),
            metrics: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run one reconciliation pass.
    pub async fn run(&self) -> ReconcileReport {
        let assets = self.stats.assets_with_successes();
        let mut report = ReconcileReport {
            examined: assets.len(),
            ..ReconcileReport::default()
        };

        let retry = Retry::new(self.retry.clone());
        for asset_id in &assets {
            let result = retry
                .run_with_predicate(|| self.reconcile_asset(asset_id), ServiceError::is_retryable)
                .await;

            match result.result {
                Ok(AssetOutcome::Created) => {
                    report.created += 1;
                    self.count(metric_names::RECONCILE_CREATED);
                }
                Ok(AssetOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    self.count(metric_names::RECONCILE_FAILED);
                    error!(
                        asset_id = %asset_id,
                        attempts = result.attempts,
                        error = %e,
                        "Failed to reconcile proof stats for asset"
                    );
                }
            }
        }

        info!(
            examined = report.examined,
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "Proof stats reconciliation finished"
        );
        if let Some(metrics) = &self.metrics {
            metrics.set_gauge(metric_names::RECONCILE_TRACKED_ASSETS, report.examined as u64);
        }
        report
    }

    async fn reconcile_asset(&self, asset_id: &AssetId) -> Result<AssetOutcome> {
        let asset = self
            .views
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| ServiceError::AssetNotFound(asset_id.clone()))?;
        let current = asset.views();

        if let Some(latest) = self.proofs.latest_proof(asset_id).await? {
            if latest.view_count >= current {
                debug!(asset_id = %asset_id, view_count = latest.view_count, "Stored proof is current");
                return Ok(AssetOutcome::Skipped);
            }
        }

        let payload = ProofPayload::SimpleVerification(SimpleVerification::new(
            current,
            VerificationSource::Reconciliation,
            Utc::now(),
        ));
        let insert = self.proofs.save_proof(asset_id, current, payload).await?;

        if insert.was_created() {
            info!(asset_id = %asset_id, view_count = current, "Stored view count snapshot");
            Ok(AssetOutcome::Created)
        } else {
            Ok(AssetOutcome::Skipped)
        }
    }

    fn count(&self, name: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_counter(name);
        }
    }
}

/// Configuration for the reconciliation worker
#[derive(Debug, Clone)]
pub struct PersisterConfig {
    pub interval: Duration,
}

impl Default for PersisterConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RECONCILE_INTERVAL,
        }
    }
}

impl PersisterConfig {
    /// Load configuration from environment
    pub fn from_env() -> Self {
        let interval = std::env::var("PROOF_STATS_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RECONCILE_INTERVAL);

        Self { interval }
    }
}

/// Ticker whose first tick is one full period away. A pass that overruns
/// pushes the schedule back instead of firing the missed ticks in a burst.
fn reconcile_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Message types for worker control
#[derive(Debug)]
pub enum PersisterMessage {
    /// Run a pass now; the report is sent back when a reply channel is given
    RunNow(Option<oneshot::Sender<ReconcileReport>>),
    /// Shutdown the worker
    Shutdown,
}

/// Background task driving `ProofStatsPersister` on a fixed period.
pub struct PersisterWorker {
    config: PersisterConfig,
    persister: Arc<ProofStatsPersister>,
    control_tx: mpsc::Sender<PersisterMessage>,
    control_rx: mpsc::Receiver<PersisterMessage>,
}

impl PersisterWorker {
    pub fn new(config: PersisterConfig, persister: Arc<ProofStatsPersister>) -> Self {
        let (control_tx, control_rx) = mpsc::channel(16);
        Self {
            config,
            persister,
            control_tx,
            control_rx,
        }
    }

    /// Get a sender handle for controlling the worker
    pub fn control_handle(&self) -> mpsc::Sender<PersisterMessage> {
        self.control_tx.clone()
    }

    pub async fn run(mut self) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting proof stats persister"
        );

        // Stats are empty at boot, so nothing to do before the first period.
        let mut ticker = reconcile_ticker(self.config.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.persister.run().await;
                }
                msg = self.control_rx.recv() => {
                    match msg {
                        Some(PersisterMessage::RunNow(reply)) => {
                            info!("Running proof stats reconciliation on demand");
                            let report = self.persister.run().await;
                            if let Some(reply) = reply {
                                if reply.send(report).is_err() {
                                    warn!("Reconciliation report receiver dropped");
                                }
                            }
                        }
                        Some(PersisterMessage::Shutdown) | None => {
                            info!("Proof stats persister shutting down");
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Spawn the persister worker as a background task
pub fn spawn_persister(
    config: PersisterConfig,
    persister: Arc<ProofStatsPersister>,
) -> (
    tokio::task::JoinHandle<()>,
    mpsc::Sender<PersisterMessage>,
) {
    let worker = PersisterWorker::new(config, persister);
    let control_handle = worker.control_handle();
    let handle = tokio::spawn(worker.run());
    (handle, control_handle)
}
