//! REST API routes for the view proof service.

use axum::routing::{get, post};
use axum::Router;

use crate::server::AppState;

use super::handlers::{
    generate_proof, get_stats, get_view_count, list_proofs, receive_proofs, record_view,
    submit_proof,
};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/assets/:id/view", get(get_view_count).post(record_view))
        .route("/assets/:id/proofs", get(list_proofs))
        .route("/assets/:id/proof", post(submit_proof))
        .route("/generateProof", post(generate_proof))
        .route("/receive-proofs", post(receive_proofs))
        .route("/stats", get(get_stats))
}

/// Root-level routes kept for clients that predate the `/api` prefix.
pub fn legacy_router() -> Router<AppState> {
    Router::new().route("/generateProof", post(generate_proof))
}
