//! View count handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::types::{RecordViewResponse, ViewCountResponse};
use crate::domain::{AssetId, Fingerprint};
use crate::server::AppState;

/// Header set by the upstream auth layer for signed-in viewers.
pub const VIEWER_ID_HEADER: &str = "x-viewer-id";

/// Resolve the deduplication fingerprint for a request.
///
/// An authenticated viewer id wins; otherwise the first `x-forwarded-for`
/// hop, then `x-real-ip`, then the socket peer.
pub fn resolve_fingerprint(headers: &HeaderMap, peer: Option<SocketAddr>) -> Fingerprint {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(user_id) = header(VIEWER_ID_HEADER) {
        return Fingerprint::user(user_id);
    }

    let forwarded = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    if let Some(ip) = forwarded.or_else(|| header("x-real-ip")) {
        return Fingerprint::ip(ip);
    }

    match peer {
        Some(addr) => Fingerprint::ip(&addr.ip().to_string()),
        None => Fingerprint::ip("unknown"),
    }
}

/// GET /api/assets/:id/view - Current view count.
#[instrument(skip(state))]
pub async fn get_view_count(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ViewCountResponse>, ApiError> {
    let views = state.views.get_view_count(&AssetId::new(id)).await?;
    Ok(Json(ViewCountResponse {
        success: true,
        views,
    }))
}

/// POST /api/assets/:id/view - Record a view subject to the cooldown.
#[instrument(skip(state, headers, peer))]
pub async fn record_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Json<RecordViewResponse>, ApiError> {
    let fingerprint = resolve_fingerprint(&headers, peer.map(|ConnectInfo(addr)| addr));
    let outcome = state
        .views
        .record_view(&AssetId::new(id), &fingerprint, Utc::now())
        .await?;

    Ok(Json(RecordViewResponse {
        success: true,
        accepted: outcome.accepted,
        views: outcome.views,
    }))
}
