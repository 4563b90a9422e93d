use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use ripple_types::api::{BlockStatus, Claims};

use crate::auth::AppState;
use crate::join_error;

/// GET /users/{id}/block-status: directional block relationship between
/// the caller and another user, read from the block subsystem's mirror.
pub async fn block_status(
    State(state): State<AppState>,
    Path(other): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let graph = state.graph.clone();
    let me = claims.sub;
    let status = tokio::task::spawn_blocking(move || -> anyhow::Result<BlockStatus> {
        Ok(BlockStatus {
            blocked_by_you: graph.blocks(me, other)?,
            blocked_you: graph.blocks(other, me)?,
        })
    })
    .await
    .map_err(join_error)?
    .map_err(|e| {
        error!("block-status lookup failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(status))
}
