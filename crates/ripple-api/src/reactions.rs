use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_types::api::{Claims, ToggleReactionRequest};

use crate::auth::AppState;
use crate::{join_error, store_status};

/// Both POST and DELETE land here: the store's reaction semantics are a pure
/// toggle on the (user, emoji) pair, so the verbs are interchangeable.
pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let user = claims.sub;
    let reactions =
        tokio::task::spawn_blocking(move || store.toggle_reaction(message_id, user, &req.emoji))
            .await
            .map_err(join_error)?
            .map_err(store_status)?;
    Ok(Json(reactions))
}
