//! Proof generation, listing and statistics handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{error, info, instrument, warn};

use crate::api::error::{ApiError, ErrorCode};
use crate::api::handlers::views::VIEWER_ID_HEADER;
use crate::api::types::{
    GenerateProofFailure, GenerateProofRequest, ProofListResponse, ReceiveProofsResponse,
    StatsResponse, SubmitProofRequest, SubmitProofResponse,
};
use crate::domain::{AssetId, ProofPayload, ProofResult};
use crate::infra::ServiceError;
use crate::server::AppState;

/// Proofs returned by the listing endpoint.
pub const PROOF_LIST_LIMIT: u32 = 10;

/// POST /api/generateProof - Generate (or fetch) a proof for a view count.
///
/// A generation whose verification stages all failed still answers 200 with
/// `success: false`; other errors from the pipeline answer 500.
#[instrument(skip_all)]
pub async fn generate_proof(
    State(state): State<AppState>,
    body: Result<Json<GenerateProofRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::new(ErrorCode::InvalidRequestBody, e.body_text()))?;
    let (asset_id, view_count) = request.validate()?;

    match state.generator.generate(&asset_id, view_count).await {
        Ok(result) => Ok(Json(result).into_response()),
        Err(e @ ServiceError::VerificationFailed { .. }) => Ok(Json(ProofResult::Failed {
            asset_id: Some(asset_id),
            view_count: Some(view_count),
            error: e.to_string(),
        })
        .into_response()),
        Err(e) => {
            error!(asset_id = %asset_id, view_count, error = %e, "Error generating proof");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GenerateProofFailure {
                    error: "Failed to generate proof".to_string(),
                    details: e.to_string(),
                }),
            )
                .into_response())
        }
    }
}

/// GET /api/assets/:id/proofs - Most recent stored proofs, newest first.
#[instrument(skip(state))]
pub async fn list_proofs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProofListResponse>, ApiError> {
    let asset_id = AssetId::new(id);
    if state.view_store.get_asset(&asset_id).await?.is_none() {
        return Err(ServiceError::AssetNotFound(asset_id).into());
    }

    let proofs = state
        .proof_store
        .list_recent_proofs(&asset_id, PROOF_LIST_LIMIT)
        .await?;

    Ok(Json(ProofListResponse {
        success: true,
        proofs,
    }))
}

/// POST /api/assets/:id/proof - Store a proof produced by the client.
///
/// Only signed-in viewers may submit. Storage is idempotent on
/// `(asset_id, viewCount)`; a repeat returns the stored proof's id.
#[instrument(skip(state, headers, body))]
pub async fn submit_proof(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<SubmitProofRequest>, JsonRejection>,
) -> Result<Json<SubmitProofResponse>, ApiError> {
    let signed_in = headers
        .get(VIEWER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().is_empty());
    if !signed_in {
        return Err(ApiError::new(ErrorCode::AuthRequired, "Authentication required"));
    }

    let Json(request) =
        body.map_err(|e| ApiError::new(ErrorCode::InvalidRequestBody, e.body_text()))?;
    let (view_count, proof) = request.validate()?;

    let asset_id = AssetId::new(id);
    if state.view_store.get_asset(&asset_id).await?.is_none() {
        return Err(ServiceError::AssetNotFound(asset_id).into());
    }

    let insert = state
        .proof_store
        .save_proof(&asset_id, view_count, proof)
        .await?;
    info!(
        asset_id = %asset_id,
        view_count,
        created = insert.was_created(),
        "Stored submitted proof"
    );

    Ok(Json(SubmitProofResponse {
        success: true,
        proof_id: insert.record().id,
        already_exists: !insert.was_created(),
    }))
}

/// POST /api/receive-proofs - Verify a batch of witness-signed proofs.
///
/// Accepts a single proof or an array. Every entry must verify.
#[instrument(skip_all)]
pub async fn receive_proofs(
    State(state): State<AppState>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<ReceiveProofsResponse>, ApiError> {
    let Json(body) =
        body.map_err(|e| ApiError::new(ErrorCode::InvalidRequestBody, e.body_text()))?;

    let entries = match body {
        serde_json::Value::Array(entries) => entries,
        single => vec![single],
    };
    if entries.is_empty() {
        return Err(ApiError::new(ErrorCode::ProofRejected, "Invalid proofs data")
            .with_details(serde_json::json!({ "reason": "no proofs" })));
    }

    let verifier = state.generator.verifier();
    for (index, entry) in entries.into_iter().enumerate() {
        let valid = match ProofPayload::from_json(entry) {
            ProofPayload::Zk(proof) => verifier.verify(&proof),
            _ => false,
        };
        if !valid {
            warn!(index, "Received proof failed verification");
            return Err(ApiError::new(ErrorCode::ProofRejected, "Invalid proofs data")
                .with_details(serde_json::json!({ "index": index })));
        }
    }

    info!("Received proofs verified");
    Ok(Json(ReceiveProofsResponse {
        message: "OK".to_string(),
    }))
}

/// GET /api/stats - Process-wide proof generation statistics.
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.stats.snapshot(),
    })
}
