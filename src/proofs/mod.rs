//! Proof generation, verification and reconciliation

mod generator;
mod http;
mod persister;
mod stats;
mod verifier;

pub use generator::{
    rewrite_origin, view_count_url, GeneratorConfig, ProofGenerator, VerificationStage,
    DEFAULT_LOCAL_FALLBACK_ORIGIN, DEFAULT_STAGE_TIMEOUT,
};
pub use http::{HttpViewCountReader, HttpZkProver};
pub use persister::{
    spawn_persister, PersisterConfig, PersisterMessage, PersisterWorker, ProofStatsPersister,
    ReconcileReport, DEFAULT_RECONCILE_INTERVAL,
};
pub use stats::ProofStatsTracker;
pub use verifier::{claim_identifier, claim_sign_payload, ClaimVerifier, ProofRejection};
