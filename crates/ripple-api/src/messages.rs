use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_types::api::{
    BulkDeleteRequest, Claims, EditMessageRequest, MessageListQuery, SendMessageRequest,
};

use crate::auth::AppState;
use crate::{join_error, store_status};

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let sender = claims.sub;
    let message = tokio::task::spawn_blocking(move || {
        store.send_message(
            req.chat_id,
            sender,
            req.content.as_deref(),
            &req.attachments,
            req.reply_to_message_id,
        )
    })
    .await
    .map_err(join_error)?
    .map_err(store_status)?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /messages/{chat_id}: recent messages, most-recent-first.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<MessageListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let viewer = claims.sub;
    let messages =
        tokio::task::spawn_blocking(move || store.list_messages(chat_id, viewer, query.limit))
            .await
            .map_err(join_error)?
            .map_err(store_status)?;
    Ok(Json(messages))
}

/// PATCH /messages/{id}: sender-only content edit.
pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let editor = claims.sub;
    let message =
        tokio::task::spawn_blocking(move || store.edit_message(message_id, editor, &req.content))
            .await
            .map_err(join_error)?
            .map_err(store_status)?;
    Ok(Json(message))
}

/// PATCH /messages/{chat_id}/read: mark-all-read for the caller.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let viewer = claims.sub;
    let marked = tokio::task::spawn_blocking(move || store.mark_read(chat_id, viewer))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

/// DELETE /messages/bulk: for_me or for_everyone; for_everyone is
/// all-or-nothing across the batch.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let requester = claims.sub;
    tokio::task::spawn_blocking(move || store.delete_messages(&req.ids, requester, req.mode))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(StatusCode::NO_CONTENT)
}
