use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use ripple_types::api::{
    ChatListQuery, Claims, CreateChatRequest, InboxUpdateRequest, UpdateSettingsRequest,
};
use ripple_types::models::ChatKind;

use crate::auth::AppState;
use crate::{join_error, store_status};

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ChatListQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let user = claims.sub;
    let chats = tokio::task::spawn_blocking(move || store.list_chats(user, query.folder))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(Json(chats))
}

pub async fn folder_counts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let user = claims.sub;
    let counts = tokio::task::spawn_blocking(move || store.folder_counts(user))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(Json(counts))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let user = claims.sub;
    let count = tokio::task::spawn_blocking(move || store.total_unread_chats(user))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(Json(count))
}

/// Create-or-get a DM. Only `dm` creation exists on this surface; group
/// chats come from elsewhere in the product.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.kind != ChatKind::Dm || req.member_ids.len() != 1 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let target = req.member_ids[0];

    let store = state.store.clone();
    let initiator = claims.sub;
    let chat = tokio::task::spawn_blocking(move || store.create_or_get_dm(initiator, target))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok((StatusCode::CREATED, Json(chat)))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let viewer = claims.sub;
    let chat = tokio::task::spawn_blocking(move || store.get_chat(chat_id, viewer))
        .await
        .map_err(join_error)?
        .map_err(store_status)?;
    Ok(Json(chat))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let viewer = claims.sub;
    let chat = tokio::task::spawn_blocking(move || {
        store.update_settings(chat_id, viewer, req.disappearing_24h, req.nickname.as_deref())
    })
    .await
    .map_err(join_error)?
    .map_err(store_status)?;
    Ok(Json(chat))
}

/// Self-targeted inbox mutation: the caller only ever moves their own entry.
pub async fn update_inbox(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InboxUpdateRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = state.store.clone();
    let viewer = claims.sub;
    let entry = tokio::task::spawn_blocking(move || {
        store.set_inbox_placement(chat_id, viewer, req.folder, req.accepted)
    })
    .await
    .map_err(join_error)?
    .map_err(store_status)?;
    Ok(Json(entry))
}
