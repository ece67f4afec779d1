//! View-count proof generation with fallback verification
//!
//! `generate` walks an explicit stage machine:
//!
//! ```text
//! ZkAttempt -> DirectPrimary -> DirectLocal -> Failed
//! ```
//!
//! A stage only runs when the previous one failed. Every external call is
//! bounded by the configured timeout, and a timeout is handled like any other
//! stage failure.
//!
//! Statistics are recorded once per call, at the ZK outcome. The idempotence
//! short-circuit (a proof already stored for this count) and configuration
//! errors record nothing.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Url;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AssetId, ProofPayload, ProofResult, SimpleVerification, VerificationSource, ZkFetchRequest,
    ZkProof,
};
use crate::infra::{ProofStore, ProofVerifier, Result, ServiceError, ViewCountReader, ZkProver};
use crate::metrics::{metric_names, timed, MetricsRegistry};

use super::ProofStatsTracker;

/// Default origin substituted in the localhost fallback stage.
pub const DEFAULT_LOCAL_FALLBACK_ORIGIN: &str = "http://localhost:3000";

/// Default timeout for prover and direct verification calls.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base URL of the app serving `/api/assets/{id}/view`
    pub client_app_url: Option<String>,
    /// Origin used for the localhost fallback stage
    pub local_fallback_origin: String,
    pub stage_timeout: Duration,
    /// Store simple-verification proofs for fallback successes
    pub persist_fallback_proofs: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            client_app_url: None,
            local_fallback_origin: DEFAULT_LOCAL_FALLBACK_ORIGIN.to_string(),
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            persist_fallback_proofs: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStage {
    ZkAttempt,
    DirectPrimary,
    DirectLocal,
    Failed,
}

impl VerificationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ZkAttempt => "zk_attempt",
            Self::DirectPrimary => "direct_primary",
            Self::DirectLocal => "direct_local",
            Self::Failed => "failed",
        }
    }
}

/// URL of the public view-count endpoint for an asset.
pub fn view_count_url(base: &str, asset_id: &AssetId) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| ServiceError::Configuration(format!("invalid CLIENT_APP_URL {base:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| {
            ServiceError::Configuration(format!("CLIENT_APP_URL {base:?} cannot be a base URL"))
        })?
        .pop_if_empty()
        .extend(["api", "assets", asset_id.as_str(), "view"]);
    Ok(url)
}

/// `url` with its scheme, host and port replaced by `origin`. Path and query
/// are kept.
pub fn rewrite_origin(url: &Url, origin: &str) -> Result<Url> {
    let mut local = Url::parse(origin).map_err(|e| {
        ServiceError::Configuration(format!("invalid LOCAL_FALLBACK_ORIGIN {origin:?}: {e}"))
    })?;
    local.set_path(url.path());
    local.set_query(url.query());
    Ok(local)
}

pub struct ProofGenerator {
    proofs: Arc<dyn ProofStore>,
    prover: Option<Arc<dyn ZkProver>>,
    verifier: Arc<dyn ProofVerifier>,
    reader: Arc<dyn ViewCountReader>,
    stats: Arc<ProofStatsTracker>,
    metrics: Option<Arc<MetricsRegistry>>,
    config: GeneratorConfig,
}

impl ProofGenerator {
    pub fn new(
        proofs: Arc<dyn ProofStore>,
        prover: Option<Arc<dyn ZkProver>>,
        verifier: Arc<dyn ProofVerifier>,
        reader: Arc<dyn ViewCountReader>,
        stats: Arc<ProofStatsTracker>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            proofs,
            prover,
            verifier,
            reader,
            stats,
            metrics: None,
            config,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn has_prover(&self) -> bool {
        self.prover.is_some()
    }

    pub fn verifier(&self) -> &Arc<dyn ProofVerifier> {
        &self.verifier
    }

    pub fn stats(&self) -> &Arc<ProofStatsTracker> {
        &self.stats
    }

    /// Produce a proof that `asset_id` has at least `view_count` views.
    #[instrument(skip_all, fields(asset_id = %asset_id, view_count = view_count))]
    pub async fn generate(&self, asset_id: &AssetId, view_count: u64) -> Result<ProofResult> {
        match &self.metrics {
            Some(metrics) => {
                timed(
                    metrics,
                    metric_names::GENERATE_LATENCY,
                    self.run_stages(asset_id, view_count),
                )
                .await
            }
            None => self.run_stages(asset_id, view_count).await,
        }
    }

    async fn run_stages(&self, asset_id: &AssetId, view_count: u64) -> Result<ProofResult> {
        match self.proofs.find_proof(asset_id, view_count).await {
            Ok(Some(existing)) => {
                info!(view_count, "Proof already exists for this view count");
                self.count(metric_names::PROOFS_ALREADY_EXISTS);
                return Ok(ProofResult::AlreadyExists {
                    asset_id: asset_id.clone(),
                    view_count,
                    proof: existing.proof,
                });
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Existing proof check failed, generating anyway"),
        }

        let base = self.config.client_app_url.as_deref().ok_or_else(|| {
            ServiceError::Configuration("CLIENT_APP_URL is not set".to_string())
        })?;
        let url = view_count_url(base, asset_id)?;

        let mut stage = VerificationStage::ZkAttempt;
        loop {
            debug!(stage = stage.as_str(), "Entering verification stage");
            stage = match stage {
                VerificationStage::ZkAttempt => match self.attempt_zk(&url, view_count).await {
                    Ok(proof) => {
                        self.stats.record(asset_id, true);
                        return self.complete_zk(asset_id, view_count, proof).await;
                    }
                    Err(reason) => {
                        self.stats.record(asset_id, false);
                        self.count(metric_names::PROOFS_ZK_FAILURE);
                        warn!(%reason, "ZK proof failed, falling back to direct verification");
                        VerificationStage::DirectPrimary
                    }
                },
                VerificationStage::DirectPrimary => {
                    if self.verify_directly(&url, view_count).await {
                        return Ok(self
                            .complete_fallback(asset_id, view_count, VerificationSource::Primary)
                            .await);
                    }
                    VerificationStage::DirectLocal
                }
                VerificationStage::DirectLocal => {
                    let local = rewrite_origin(&url, &self.config.local_fallback_origin)?;
                    if self.verify_directly(&local, view_count).await {
                        return Ok(self
                            .complete_fallback(asset_id, view_count, VerificationSource::Localhost)
                            .await);
                    }
                    VerificationStage::Failed
                }
                VerificationStage::Failed => {
                    self.count(metric_names::PROOFS_FAILED);
                    warn!(view_count, "All verification stages failed");
                    return Err(ServiceError::VerificationFailed {
                        asset_id: asset_id.clone(),
                        expected: view_count,
                    });
                }
            };
        }
    }

    /// Fetch and independently verify a ZK proof. The error is the reason for
    /// falling through to the next stage.
    async fn attempt_zk(&self, url: &Url, view_count: u64) -> std::result::Result<ZkProof, String> {
        let prover = self
            .prover
            .as_ref()
            .ok_or_else(|| "no ZK prover configured".to_string())?;

        let request = ZkFetchRequest::view_count(url.as_str());
        let proof = match tokio::time::timeout(self.config.stage_timeout, prover.zk_fetch(&request))
            .await
        {
            Err(_) => return Err(format!("prover timed out after {:?}", self.config.stage_timeout)),
            Ok(Err(e)) => return Err(e.to_string()),
            Ok(Ok(None)) => return Err("prover returned no proof".to_string()),
            Ok(Ok(Some(proof))) => proof,
        };

        if !self.verifier.verify(&proof) {
            return Err("proof failed verification".to_string());
        }

        if let Some(attested) = proof.extracted_views() {
            if attested < view_count {
                return Err(format!(
                    "proof attests {attested} views, expected at least {view_count}"
                ));
            }
        }

        Ok(proof)
    }

    async fn complete_zk(
        &self,
        asset_id: &AssetId,
        view_count: u64,
        proof: ZkProof,
    ) -> Result<ProofResult> {
        let transformed_proof = self.verifier.transform_for_onchain(&proof);

        let insert = self
            .proofs
            .save_proof(asset_id, view_count, ProofPayload::zk(proof.clone()))
            .await?;
        if !insert.was_created() {
            debug!(proof_id = %insert.record().id, "Concurrent request stored this proof first");
        }

        self.count(metric_names::PROOFS_ZK_SUCCESS);
        info!(view_count, "ZK proof generated and verified");

        Ok(ProofResult::Generated {
            asset_id: asset_id.clone(),
            view_count,
            transformed_proof,
            proof: Box::new(proof),
        })
    }

    async fn complete_fallback(
        &self,
        asset_id: &AssetId,
        view_count: u64,
        source: VerificationSource,
    ) -> ProofResult {
        if self.config.persist_fallback_proofs {
            let payload =
                ProofPayload::SimpleVerification(SimpleVerification::new(view_count, source, Utc::now()));
            if let Err(e) = self.proofs.save_proof(asset_id, view_count, payload).await {
                warn!(error = %e, "Failed to store simple verification proof");
            }
        }

        self.count(metric_names::PROOFS_SIMPLE_VERIFICATION);
        info!(view_count, ?source, "View count verified directly");

        ProofResult::SimpleVerification {
            asset_id: asset_id.clone(),
            view_count,
            source,
        }
    }

    /// `true` when the endpoint reports at least `expected` views.
    async fn verify_directly(&self, url: &Url, expected: u64) -> bool {
        match tokio::time::timeout(self.config.stage_timeout, self.reader.read_views(url.as_str()))
            .await
        {
            Ok(Ok(reported)) => {
                debug!(%url, reported, expected, "Direct verification read");
                reported >= expected
            }
            Ok(Err(e)) => {
                warn!(%url, error = %e, "Direct verification failed");
                false
            }
            Err(_) => {
                warn!(%url, "Direct verification timed out");
                false
            }
        }
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
    use crate::domain::{ClaimData, ProofInsert, ProofRecord};
    use crate::infra::{
        MemoryStore, MockProofStore, MockProofVerifier, MockViewCountReader, MockZkProver,
    };
    use crate::proofs::ClaimVerifier;
    use mockall::Sequence;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    const BASE: &str = "https://app.example";

    fn proof_with_views(views: u64) -> ZkProof {
        let mut extracted = BTreeMap::new();
        extracted.insert("view".to_string(), views.to_string());
        ZkProof {
            identifier: "0x01".to_string(),
            claim_data: ClaimData {
                provider: "http".to_string(),
                parameters: "{}".to_string(),
                owner: "0x0000000000000000000000000000000000000001".to_string(),
                timestamp_s: 1_700_000_000,
                context: String::new(),
                identifier: "0x01".to_string(),
                epoch: 1,
            },
            signatures: vec!["0x00".to_string()],
            witnesses: vec![],
            extracted_parameter_values: extracted,
            public_data: None,
        }
    }

    fn accepting_verifier() -> MockProofVerifier {
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(true);
        verifier
            .expect_transform_for_onchain()
            .returning(|p| ClaimVerifier::new().transform_for_onchain(p));
        verifier
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig {
            client_app_url: Some(BASE.to_string()),
            stage_timeout: Duration::from_millis(200),
            ..GeneratorConfig::default()
        }
    }

    fn generator(
        store: Arc<dyn ProofStore>,
        prover: Option<MockZkProver>,
        verifier: MockProofVerifier,
        reader: MockViewCountReader,
        config: GeneratorConfig,
    ) -> ProofGenerator {
        ProofGenerator::new(
            store,
            prover.map(|p| Arc::new(p) as Arc<dyn ZkProver>),
            Arc::new(verifier),
            Arc::new(reader),
            Arc::new(ProofStatsTracker::new()),
            config,
        )
    }

    fn failing_prover() -> MockZkProver {
        let mut prover = MockZkProver::new();
        prover.expect_zk_fetch().returning(|_| Ok(None));
        prover
    }

    #[test]
    fn test_view_count_url() {
        let id = AssetId::new("A1");
        assert_eq!(
            view_count_url(BASE, &id).unwrap().as_str(),
            "https://app.example/api/assets/A1/view"
        );
        assert_eq!(
            view_count_url("https://app.example/", &id).unwrap().as_str(),
            "https://app.example/api/assets/A1/view"
        );
        assert_eq!(
            view_count_url(BASE, &AssetId::new("a b/c")).unwrap().as_str(),
            "https://app.example/api/assets/a%20b%2Fc/view"
        );
        assert!(matches!(
            view_count_url("not a url", &id),
            Err(ServiceError::Configuration(_))
        ));
    }

    #[test]
    fn test_rewrite_origin_keeps_path() {
        let url = Url::parse("https://app.example:8443/api/assets/A1/view?x=1").unwrap();
        let local = rewrite_origin(&url, DEFAULT_LOCAL_FALLBACK_ORIGIN).unwrap();
        assert_eq!(local.as_str(), "http://localhost:3000/api/assets/A1/view?x=1");
    }

    #[tokio::test]
    async fn test_zk_success_persists_and_records() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .withf(|req| req.url == "https://app.example/api/assets/A1/view" && req.method == "GET")
            .times(1)
            .returning(|_| Ok(Some(proof_with_views(2))));
        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().never();

        let gen = generator(store.clone(), Some(prover), accepting_verifier(), reader, config());
        let result = gen.generate(&id, 2).await.unwrap();

        assert!(matches!(result, ProofResult::Generated { view_count: 2, .. }));
        assert_eq!(store.proof_count(&id).await, 1);
        assert!(store.find_proof(&id, 2).await.unwrap().unwrap().proof.is_zk());

        let stats = gen.stats().snapshot();
        let asset = stats.asset(&id).unwrap();
        assert_eq!((asset.attempts, asset.successes, asset.failures), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_second_call_short_circuits_without_stats() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .times(1)
            .returning(|_| Ok(Some(proof_with_views(2))));

        let gen = generator(
            store.clone(),
            Some(prover),
            accepting_verifier(),
            MockViewCountReader::new(),
            config(),
        );
        gen.generate(&id, 2).await.unwrap();
        let second = gen.generate(&id, 2).await.unwrap();

        assert!(matches!(second, ProofResult::AlreadyExists { .. }));
        assert_eq!(store.proof_count(&id).await, 1);
        assert_eq!(gen.stats().snapshot().attempts, 1);
    }

    #[tokio::test]
    async fn test_fallback_chain_order() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");
        let mut seq = Sequence::new();

        let mut reader = MockViewCountReader::new();
        reader
            .expect_read_views()
            .withf(|url| url == "https://app.example/api/assets/A1/view")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ServiceError::ExternalService("connection refused".into())));
        reader
            .expect_read_views()
            .withf(|url| url == "http://localhost:3000/api/assets/A1/view")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));

        let gen = generator(
            store.clone(),
            Some(failing_prover()),
            accepting_verifier(),
            reader,
            config(),
        );
        let err = gen.generate(&id, 5).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::VerificationFailed { expected: 5, .. }
        ));
        assert_eq!(store.proof_count(&id).await, 0);

        let stats = gen.stats().snapshot();
        let asset = stats.asset(&id).unwrap();
        assert_eq!((asset.attempts, asset.successes, asset.failures), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_primary_fallback_success_is_persisted() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().times(1).returning(|_| Ok(7));

        let gen = generator(
            store.clone(),
            Some(failing_prover()),
            accepting_verifier(),
            reader,
            config(),
        );
        let result = gen.generate(&id, 5).await.unwrap();

        assert_eq!(
            result,
            ProofResult::SimpleVerification {
                asset_id: id.clone(),
                view_count: 5,
                source: VerificationSource::Primary,
            }
        );
        let stored = store.find_proof(&id, 5).await.unwrap().unwrap();
        assert!(matches!(stored.proof, ProofPayload::SimpleVerification(_)));
    }

    #[tokio::test]
    async fn test_fallback_not_persisted_when_disabled() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().returning(|_| Ok(5));

        let config = GeneratorConfig {
            persist_fallback_proofs: false,
            ..config()
        };
        let gen = generator(store.clone(), None, accepting_verifier(), reader, config);
        let result = gen.generate(&id, 5).await.unwrap();

        assert!(matches!(result, ProofResult::SimpleVerification { .. }));
        assert_eq!(store.proof_count(&id).await, 0);
    }

    #[tokio::test]
    async fn test_localhost_success() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut reader = MockViewCountReader::new();
        reader
            .expect_read_views()
            .withf(|url| url == "https://app.example/api/assets/A1/view")
            .returning(|_| Ok(3));
        reader
            .expect_read_views()
            .withf(|url| url == "http://localhost:3000/api/assets/A1/view")
            .returning(|_| Ok(4));

        let gen = generator(store, None, accepting_verifier(), reader, config());
        let result = gen.generate(&id, 4).await.unwrap();

        assert!(matches!(
            result,
            ProofResult::SimpleVerification {
                source: VerificationSource::Localhost,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rejected_proof_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .returning(|_| Ok(Some(proof_with_views(9))));
        let mut verifier = MockProofVerifier::new();
        verifier.expect_verify().return_const(false);
        verifier.expect_transform_for_onchain().never();
        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().times(1).returning(|_| Ok(9));

        let gen = generator(store, Some(prover), verifier, reader, config());
        let result = gen.generate(&id, 9).await.unwrap();

        assert!(matches!(result, ProofResult::SimpleVerification { .. }));
        assert_eq!(gen.stats().snapshot().failures, 1);
    }

    #[tokio::test]
    async fn test_proof_attesting_fewer_views_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .returning(|_| Ok(Some(proof_with_views(1))));
        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().returning(|_| Ok(1));

        let gen = generator(store, Some(prover), accepting_verifier(), reader, config());
        let err = gen.generate(&id, 3).await.unwrap_err();

        assert!(matches!(err, ServiceError::VerificationFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prover_timeout_falls_back() {
        let store = Arc::new(MemoryStore::new());
        let id = AssetId::new("A1");

        struct HangingProver;

        #[async_trait::async_trait]
        impl ZkProver for HangingProver {
            async fn zk_fetch(&self, _: &ZkFetchRequest) -> Result<Option<ZkProof>> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }

        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().times(1).returning(|_| Ok(2));

        let gen = ProofGenerator::new(
            store,
            Some(Arc::new(HangingProver)),
            Arc::new(accepting_verifier()),
            Arc::new(reader),
            Arc::new(ProofStatsTracker::new()),
            config(),
        );
        let result = gen.generate(&id, 2).await.unwrap();

        assert!(matches!(result, ProofResult::SimpleVerification { .. }));
    }

    #[tokio::test]
    async fn test_missing_base_url_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let config = GeneratorConfig {
            client_app_url: None,
            ..config()
        };
        let gen = generator(
            store,
            Some(MockZkProver::new()),
            MockProofVerifier::new(),
            MockViewCountReader::new(),
            config,
        );

        let err = gen.generate(&AssetId::new("A1"), 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
        assert_eq!(gen.stats().snapshot().attempts, 0);
    }

    #[tokio::test]
    async fn test_existing_check_failure_continues() {
        let id = AssetId::new("A1");
        let mut store = MockProofStore::new();
        store
            .expect_find_proof()
            .returning(|_, _| Err(ServiceError::Persistence(sqlx::Error::PoolTimedOut)));
        store.expect_save_proof().times(1).returning(|asset_id, count, proof| {
            Ok(ProofInsert::Created(ProofRecord {
                id: Uuid::new_v4(),
                asset_id: asset_id.clone(),
                view_count: count,
                proof,
                timestamp: Utc::now(),
            }))
        });

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .returning(|_| Ok(Some(proof_with_views(1))));

        let gen = generator(
            Arc::new(store),
            Some(prover),
            accepting_verifier(),
            MockViewCountReader::new(),
            config(),
        );
        let result = gen.generate(&id, 1).await.unwrap();

        assert!(matches!(result, ProofResult::Generated { .. }));
    }

    #[tokio::test]
    async fn test_zk_persistence_error_surfaces() {
        let mut store = MockProofStore::new();
        store.expect_find_proof().returning(|_, _| Ok(None));
        store
            .expect_save_proof()
            .returning(|_, _, _| Err(ServiceError::Persistence(sqlx::Error::PoolClosed)));

        let mut prover = MockZkProver::new();
        prover
            .expect_zk_fetch()
            .returning(|_| Ok(Some(proof_with_views(1))));

        let gen = generator(
            Arc::new(store),
            Some(prover),
            accepting_verifier(),
            MockViewCountReader::new(),
            config(),
        );
        let err = gen.generate(&AssetId::new("A1"), 1).await.unwrap_err();

        assert!(matches!(err, ServiceError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let store = Arc::new(MemoryStore::new());
        let metrics = Arc::new(MetricsRegistry::new());
        let mut reader = MockViewCountReader::new();
        reader.expect_read_views().returning(|_| Ok(0));

        let gen = generator(store, None, accepting_verifier(), reader, config())
            .with_metrics(metrics.clone());
        let _ = gen.generate(&AssetId::new("A1"), 1).await;

        assert_eq!(metrics.get_counter(metric_names::PROOFS_ZK_FAILURE), 1);
        assert_eq!(metrics.get_counter(metric_names::PROOFS_FAILED), 1);
        assert_eq!(
            metrics.to_json()["histograms"][metric_names::GENERATE_LATENCY]["count"],
            1
        );
    }
}
