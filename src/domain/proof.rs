//! Persisted view-count proofs and the result envelope returned to callers.

use chrono::{DateTime, Utc};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssetId, OnchainProof, ZkProof};

/// Where a non-cryptographic confirmation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationSource {
    /// Direct fetch against the configured public endpoint.
    Primary,
    /// Direct fetch against the loopback-rewritten endpoint.
    Localhost,
    /// Snapshot written by the scheduled reconciliation job.
    Reconciliation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleVerificationKind {
    #[serde(rename = "simple-verification")]
    SimpleVerification,
}

/// Marker payload for counts confirmed without a ZK proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleVerification {
    #[serde(rename = "type")]
    pub kind: SimpleVerificationKind,
    pub timestamp: DateTime<Utc>,
    pub view_count: u64,
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<VerificationSource>,
}

impl SimpleVerification {
    pub fn new(view_count: u64, source: VerificationSource, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: SimpleVerificationKind::SimpleVerification,
            timestamp,
            view_count,
            verified: true,
            source: Some(source),
        }
    }
}

/// Stored proof body. Rows written by other tools may hold arbitrary JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProofPayload {
    SimpleVerification(SimpleVerification),
    Zk(Box<ZkProof>),
    Opaque(serde_json::Value),
}

impl ProofPayload {
    pub fn zk(proof: ZkProof) -> Self {
        Self::Zk(Box::new(proof))
    }

    pub fn is_zk(&self) -> bool {
        matches!(self, Self::Zk(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(Self::Opaque(value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRecord {
    pub id: Uuid,
    pub asset_id: AssetId,
    pub view_count: u64,
    pub proof: ProofPayload,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of an idempotent proof insert keyed by `(asset_id, view_count)`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProofInsert {
    Created(ProofRecord),
    Existing(ProofRecord),
}

impl ProofInsert {
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    pub fn record(&self) -> &ProofRecord {
        match self {
            Self::Created(record) | Self::Existing(record) => record,
        }
    }
}

/// Result of a proof request.
///
/// Serialized as a flat object with a `success` flag so clients can tell a
/// fresh ZK proof from a recycled one or a non-cryptographic confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProofResult {
    Generated {
        asset_id: AssetId,
        view_count: u64,
        transformed_proof: OnchainProof,
        proof: Box<ZkProof>,
    },
    AlreadyExists {
        asset_id: AssetId,
        view_count: u64,
        proof: ProofPayload,
    },
    SimpleVerification {
        asset_id: AssetId,
        view_count: u64,
        source: VerificationSource,
    },
    Failed {
        asset_id: Option<AssetId>,
        view_count: Option<u64>,
        error: String,
    },
}

impl ProofResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::Generated { .. } => "ZK proof successfully generated".to_string(),
            Self::AlreadyExists { .. } => "Proof already exists for this view count".to_string(),
            Self::SimpleVerification {
                source: VerificationSource::Localhost,
                ..
            } => "Verified directly through localhost".to_string(),
            Self::SimpleVerification { .. } => "Verified directly".to_string(),
            Self::Failed { error, .. } => error.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProofResultWire<'a> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    asset_id: Option<&'a AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transformed_proof: Option<&'a OnchainProof>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    already_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    simple_verification: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification_source: Option<VerificationSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl Serialize for ProofResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut wire = ProofResultWire {
            success: self.is_success(),
            asset_id: None,
            view_count: None,
            transformed_proof: None,
            proof: None,
            already_exists: None,
            simple_verification: None,
            verification_source: None,
            message: Some(self.message()),
            error: None,
        };

        match self {
            Self::Generated {
                asset_id,
                view_count,
                transformed_proof,
                proof,
            } => {
                wire.asset_id = Some(asset_id);
                wire.view_count = Some(*view_count);
                wire.transformed_proof = Some(transformed_proof);
                wire.proof = Some(serde_json::to_value(proof).map_err(serde::ser::Error::custom)?);
            }
            Self::AlreadyExists {
                asset_id,
                view_count,
                proof,
            } => {
                wire.asset_id = Some(asset_id);
                wire.view_count = Some(*view_count);
                wire.proof = Some(proof.to_json());
                wire.already_exists = Some(true);
            }
            Self::SimpleVerification {
                asset_id,
                view_count,
                source,
            } => {
                wire.asset_id = Some(asset_id);
                wire.view_count = Some(*view_count);
                wire.simple_verification = Some(true);
                wire.verification_source = Some(*source);
            }
            Self::Failed {
                asset_id,
                view_count,
                error,
            } => {
                wire.asset_id = asset_id.as_ref();
                wire.view_count = *view_count;
                wire.message = None;
                wire.error = Some(error);
            }
        }

        wire.serialize(serializer)
    }
}
