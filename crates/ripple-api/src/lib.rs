pub mod auth;
pub mod chats;
pub mod messages;
pub mod middleware;
pub mod reactions;
pub mod users;

use axum::http::StatusCode;
use tracing::error;

use ripple_store::StoreError;

/// Map store errors onto REST status codes. Every taxonomy variant surfaces
/// synchronously as a 4xx; only db failures become 500s.
pub(crate) fn store_status(err: StoreError) -> StatusCode {
    match err {
        StoreError::InvalidMembers | StoreError::EmptyMessage => StatusCode::BAD_REQUEST,
        StoreError::NotAMember | StoreError::Forbidden | StoreError::Blocked => {
            StatusCode::FORBIDDEN
        }
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Db(e) => {
            error!("store db error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub(crate) fn join_error(err: tokio::task::JoinError) -> StatusCode {
    error!("spawn_blocking join error: {}", err);
    StatusCode::INTERNAL_SERVER_ERROR
}
