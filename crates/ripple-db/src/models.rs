//! Database row types mapping directly to SQLite rows. Distinct from the
//! ripple-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub profile_pic: Option<String>,
    pub last_seen: Option<String>,
}

pub struct ChatRow {
    pub id: String,
    pub kind: String,
    pub name: Option<String>,
    pub disappearing_24h: bool,
    pub last_activity_at: String,
    pub created_at: String,
}

pub struct InboxRow {
    pub chat_id: String,
    pub user_id: String,
    pub folder: String,
    pub accepted: bool,
}

pub struct MemberRow {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_pic: Option<String>,
    pub last_seen: Option<String>,
}

pub struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: Option<String>,
    pub reply_to_message_id: Option<String>,
    pub created_at: String,
    pub edited_at: Option<String>,
}

pub struct AttachmentRow {
    pub message_id: String,
    pub kind: String,
    pub url: String,
    pub name: Option<String>,
}

pub struct ReactionRow {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
}

pub struct ReadRow {
    pub message_id: String,
    pub user_id: String,
}

pub struct PreviewRow {
    pub sender_id: String,
    pub content: Option<String>,
    pub created_at: String,
}
