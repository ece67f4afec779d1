//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use reqwest::Url;

use view_proof_service::domain::{
    Asset, AssetId, ClaimData, WitnessData, ZkFetchRequest, ZkProof,
};
use view_proof_service::infra::{
    MemoryStore, ProofStore, Result, ServiceError, ViewCountReader, ViewStore, ZkProver,
};
use view_proof_service::metrics::MetricsRegistry;
use view_proof_service::proofs::{
    claim_identifier, claim_sign_payload, ClaimVerifier, GeneratorConfig, ProofGenerator,
    ProofStatsTracker,
};
use view_proof_service::server::AppState;

/// Well-known development key; address 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266.
pub const WITNESS_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const CLIENT_APP_URL: &str = "https://app.example";

/// Store with the given assets already created.
pub async fn seeded_store(assets: &[(&str, u64)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (id, views) in assets {
        store
            .upsert_asset(&Asset::new(AssetId::new(*id)).with_views(*views))
            .await
            .unwrap();
    }
    store
}

/// A witness-signed proof that `url` reported `views`.
pub fn signed_proof(url: &str, views: u64) -> ZkProof {
    let signer: PrivateKeySigner = WITNESS_KEY.parse().unwrap();
    let provider = "http".to_string();
    let parameters = serde_json::json!({ "url": url, "method": "GET" }).to_string();
    let context =
        serde_json::json!({ "extractedParameters": { "view": views.to_string() } }).to_string();
    let identifier = claim_identifier(&provider, &parameters, &context);

    let claim = ClaimData {
        provider,
        parameters,
        owner: "0x00000000000000000000000000000000000000aa".to_string(),
        timestamp_s: 1_700_000_000,
        context,
        identifier: identifier.clone(),
        epoch: 1,
    };
    let signature = signer
        .sign_message_sync(claim_sign_payload(&claim).as_bytes())
        .unwrap();

    let mut extracted = BTreeMap::new();
    extracted.insert("view".to_string(), views.to_string());

    ZkProof {
        identifier,
        claim_data: claim,
        signatures: vec![format!("0x{}", hex::encode(signature.as_bytes()))],
        witnesses: vec![WitnessData {
            id: signer.address().to_string(),
            url: "wss://witness.example/ws".to_string(),
        }],
        extracted_parameter_values: extracted,
        public_data: None,
    }
}

/// Prover that signs whatever the store currently reports for the asset.
pub struct StoreBackedProver {
    store: Arc<MemoryStore>,
    pub calls: AtomicUsize,
}

impl StoreBackedProver {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ZkProver for StoreBackedProver {
    async fn zk_fetch(&self, request: &ZkFetchRequest) -> Result<Option<ZkProof>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let views = views_for_url(&self.store, &request.url).await?;
        Ok(Some(signed_proof(&request.url, views)))
    }
}

/// Prover that always fails.
pub struct FailingProver;

#[async_trait]
impl ZkProver for FailingProver {
    async fn zk_fetch(&self, _request: &ZkFetchRequest) -> Result<Option<ZkProof>> {
        Err(ServiceError::ExternalService("prover offline".to_string()))
    }
}

/// Reads view counts straight from the store, ignoring the host. Records
/// every URL it was asked for.
pub struct StoreBackedReader {
    store: Arc<MemoryStore>,
    /// Hosts that answer with an error
    unreachable_hosts: Vec<String>,
    pub requested: std::sync::Mutex<Vec<String>>,
}

impl StoreBackedReader {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            unreachable_hosts: Vec::new(),
            requested: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_unreachable_host(mut self, host: &str) -> Self {
        self.unreachable_hosts.push(host.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ViewCountReader for StoreBackedReader {
    async fn read_views(&self, url: &str) -> Result<u64> {
        self.requested.lock().unwrap().push(url.to_string());
        let parsed = Url::parse(url).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
        if let Some(host) = parsed.host_str() {
            if self.unreachable_hosts.iter().any(|h| h == host) {
                return Err(ServiceError::ExternalService(format!("{host} unreachable")));
            }
        }
        views_for_url(&self.store, url).await
    }
}

async fn views_for_url(store: &MemoryStore, url: &str) -> Result<u64> {
    let parsed = Url::parse(url).map_err(|e| ServiceError::InvalidInput(e.to_string()))?;
    let segments: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();
    let asset_id = match segments.as_slice() {
        ["api", "assets", id, "view"] => AssetId::new(*id),
        _ => return Err(ServiceError::InvalidInput(format!("unexpected url {url}"))),
    };
    store
        .get_asset(&asset_id)
        .await?
        .map(|a| a.views())
        .ok_or(ServiceError::AssetNotFound(asset_id))
}

pub fn generator_config() -> GeneratorConfig {
    GeneratorConfig {
        client_app_url: Some(CLIENT_APP_URL.to_string()),
        stage_timeout: Duration::from_secs(2),
        ..GeneratorConfig::default()
    }
}

pub fn generator(
    store: Arc<MemoryStore>,
    prover: Option<Arc<dyn ZkProver>>,
    reader: Arc<dyn ViewCountReader>,
    config: GeneratorConfig,
) -> ProofGenerator {
    let proofs: Arc<dyn ProofStore> = store;
    ProofGenerator::new(
        proofs,
        prover,
        Arc::new(ClaimVerifier::new()),
        reader,
        Arc::new(ProofStatsTracker::new()),
        config,
    )
}

/// Application state over a single in-memory store with a store-backed prover.
pub fn app_state(store: Arc<MemoryStore>) -> AppState {
    let metrics = Arc::new(MetricsRegistry::new());
    let prover: Arc<dyn ZkProver> = Arc::new(StoreBackedProver::new(store.clone()));
    let reader: Arc<dyn ViewCountReader> = Arc::new(StoreBackedReader::new(store.clone()));
    let generator = generator(store.clone(), Some(prover), reader, generator_config())
        .with_metrics(metrics.clone());

    let views: Arc<dyn ViewStore> = store.clone();
    let proofs: Arc<dyn ProofStore> = store;
    AppState::new(
        views,
        proofs,
        Arc::new(generator),
        chrono::Duration::hours(1),
        metrics,
    )
}
