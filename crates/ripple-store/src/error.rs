use thiserror::Error;

/// Conversation Store error taxonomy. Every variant except `Db` maps to a
/// 4xx at the REST boundary and is surfaced synchronously to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed chat-creation request, e.g. a self-DM.
    #[error("invalid chat members")]
    InvalidMembers,

    /// Operation attempted by a non-participant.
    #[error("not a member of this chat")]
    NotAMember,

    /// Send with neither content nor attachments.
    #[error("message has no content or attachments")]
    EmptyMessage,

    /// Edit or delete-for-everyone attempted by a non-owner, or an
    /// un-accept of an inbox entry.
    #[error("forbidden")]
    Forbidden,

    /// A block relationship exists between sender and recipient.
    #[error("blocked")]
    Blocked,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Db(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
