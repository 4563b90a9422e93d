use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Attachment, ChatKind, ChatMember, ChatSettings, DeleteMode, InboxEntry, InboxFolder, Message,
};

// -- JWT Claims --

/// Canonical claims shared by the REST middleware and the gateway Identify
/// handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Chats --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChatRequest {
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub member_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ChatListQuery {
    pub folder: Option<InboxFolder>,
}

/// Trimmed last message for inbox previews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub sender_id: Uuid,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of the caller's chat list, ordered by most recent activity.
/// `folder`, `accepted` and `nickname` are the caller's own inbox view;
/// `unread_count` is server-computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: Uuid,
    pub kind: ChatKind,
    pub name: Option<String>,
    pub members: Vec<ChatMember>,
    pub folder: InboxFolder,
    pub accepted: bool,
    pub nickname: Option<String>,
    pub unread_count: u64,
    pub last_activity_at: DateTime<Utc>,
    pub last_message: Option<MessagePreview>,
}

/// Full chat detail, including every member's inbox entry. The caller's own
/// entry is duplicated at the top level so the client never has to stash it
/// in ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatDetail {
    pub id: Uuid,
    pub kind: ChatKind,
    pub name: Option<String>,
    pub members: Vec<ChatMember>,
    pub settings: ChatSettings,
    pub inboxes: Vec<InboxEntry>,
    pub my_inbox: InboxEntry,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderCounts {
    pub primary: u64,
    pub general: u64,
    pub requests: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread_chats: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateSettingsRequest {
    pub disappearing_24h: Option<bool>,
    pub nickname: Option<String>,
}

/// Self-targeted inbox mutation: relocate between Primary and General, or
/// accept a pending request (one-way).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboxUpdateRequest {
    pub folder: Option<InboxFolder>,
    pub accepted: Option<bool>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub chat_id: Uuid,
    pub content: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub reply_to_message_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    #[serde(default = "default_message_limit")]
    pub limit: u32,
}

fn default_message_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkDeleteRequest {
    pub ids: Vec<Uuid>,
    pub mode: DeleteMode,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
}

pub type MessageResponse = Message;

// -- Users --

/// Directional block relationship between the caller and another user, read
/// from the external block subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockStatus {
    #[serde(rename = "blockedByYou")]
    pub blocked_by_you: bool,
    #[serde(rename = "blockedYou")]
    pub blocked_you: bool,
}
