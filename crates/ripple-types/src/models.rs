use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Dm,
    Group,
}

impl ChatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Group => "group",
        }
    }
}

/// Per-member triage bucket. A new DM lands in Requests for a recipient who
/// does not follow the sender back, and stays there until accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InboxFolder {
    Primary,
    General,
    Requests,
}

impl InboxFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::General => "general",
            Self::Requests => "requests",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "general" => Some(Self::General),
            "requests" => Some(Self::Requests),
            _ => None,
        }
    }
}

/// One inbox entry per chat member. `accepted` is one-way: once flipped to
/// true it never goes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    pub user_id: Uuid,
    pub folder: InboxFolder,
    pub accepted: bool,
}

/// Per-chat configuration, as seen by one viewer. `nickname` is that
/// viewer's private label for the conversation, not shared with others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub disappearing_24h: bool,
    pub nickname: Option<String>,
}

/// Denormalized member profile for rendering a chat header before any
/// gateway connection exists. `last_seen` is the cold-start presence value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMember {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_pic: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub user_id: Uuid,
    pub emoji: String,
}

/// Fully assembled message as served over REST and echoed over the gateway.
/// `read_by` grows monotonically; `created_at` never changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: Option<String>,
    pub attachments: Vec<Attachment>,
    pub reply_to_message_id: Option<Uuid>,
    pub reactions: Vec<Reaction>,
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub edited_at: Option<DateTime<Utc>>,
}

/// Bulk-delete mode. `ForEveryone` removes the rows for every viewer and is
/// sender-gated; `ForMe` only adds the requester to a suppression set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    ForMe,
    ForEveryone,
}
