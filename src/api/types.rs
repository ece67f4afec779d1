//! Shared request and response types for REST API handlers.

use serde::{Deserialize, Serialize};

use crate::domain::{AssetId, ProofGenerationStats, ProofPayload, ProofRecord};

use super::error::{missing_field, validation_error, ApiError};

// ============================================================================
// View types
// ============================================================================

/// Response for `GET /api/assets/:id/view`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewCountResponse {
    pub success: bool,
    pub views: u64,
}

/// Response for `POST /api/assets/:id/view`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordViewResponse {
    pub success: bool,
    /// False when the view fell inside the cooldown window
    pub accepted: bool,
    pub views: u64,
}

// ============================================================================
// Proof types
// ============================================================================

/// Request body for `POST /api/generateProof`.
///
/// `viewCount` is kept as raw JSON so a wrong type is reported as a field
/// error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofRequest {
    pub asset_id: Option<String>,
    pub view_count: Option<serde_json::Value>,
}

impl GenerateProofRequest {
    pub fn validate(self) -> Result<(AssetId, u64), ApiError> {
        const MISSING: &str = "Missing required parameters: assetId and viewCount";

        let asset_id = self
            .asset_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| missing_field("assetId", MISSING))?;

        let view_count = match self.view_count {
            None | Some(serde_json::Value::Null) => return Err(missing_field("viewCount", MISSING)),
            Some(value) => value.as_u64().ok_or_else(|| {
                validation_error("viewCount", "viewCount must be a non-negative integer")
            })?,
        };

        Ok((AssetId::new(asset_id), view_count))
    }
}

/// Body returned when proof generation itself errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateProofFailure {
    pub error: String,
    pub details: String,
}

/// Request body for `POST /api/assets/:id/proof`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
    pub view_count: Option<serde_json::Value>,
    pub proof: Option<serde_json::Value>,
}

impl SubmitProofRequest {
    /// A zero count carries nothing to attest and is treated as missing.
    pub fn validate(self) -> Result<(u64, ProofPayload), ApiError> {
        const MISSING: &str = "Missing required fields: viewCount and proof";

        let view_count = match self.view_count {
            None | Some(serde_json::Value::Null) => return Err(missing_field("viewCount", MISSING)),
            Some(value) => value.as_u64().ok_or_else(|| {
                validation_error("viewCount", "viewCount must be a non-negative integer")
            })?,
        };
        if view_count == 0 {
            return Err(missing_field("viewCount", MISSING));
        }

        let proof = self
            .proof
            .filter(|p| !p.is_null())
            .ok_or_else(|| missing_field("proof", MISSING))?;

        Ok((view_count, ProofPayload::from_json(proof)))
    }
}

/// Response for `POST /api/assets/:id/proof`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofResponse {
    pub success: bool,
    pub proof_id: uuid::Uuid,
    /// True when a proof for this count was already stored
    pub already_exists: bool,
}

/// Response for `POST /api/receive-proofs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiveProofsResponse {
    pub message: String,
}

/// Response for `GET /api/assets/:id/proofs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProofListResponse {
    pub success: bool,
    pub proofs: Vec<ProofRecord>,
}

/// Response for `GET /api/stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: ProofGenerationStats,
}
