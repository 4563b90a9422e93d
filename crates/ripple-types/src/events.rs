use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Reaction};

/// Events pushed from the server to gateway clients.
///
/// Chat-scoped events are delivered only to connections that joined the
/// corresponding room. Delivery is at-most-once and best-effort: the gateway
/// is a notification hint, never the system of record, and a reconnecting
/// client re-fetches state over REST.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms a successful Identify handshake.
    #[serde(rename = "ready")]
    Ready { user_id: Uuid },

    #[serde(rename = "message:new")]
    MessageNew { message: Message },

    #[serde(rename = "message:updated")]
    MessageUpdated {
        chat_id: Uuid,
        message_id: Uuid,
        content: String,
        edited_at: DateTime<Utc>,
    },

    /// Hard deletion, broadcast per chat. `for_me` deletes never produce an
    /// event; they are invisible to other viewers.
    #[serde(rename = "message:deleted")]
    MessageDeleted {
        chat_id: Uuid,
        message_ids: Vec<Uuid>,
    },

    /// Full replacement list after a reaction toggle.
    #[serde(rename = "message:reactions")]
    MessageReactions {
        chat_id: Uuid,
        message_id: Uuid,
        reactions: Vec<Reaction>,
    },

    /// Ephemeral; receivers clear the indicator after 2.5s without a renewal
    /// since no stop event exists.
    #[serde(rename = "user:typing")]
    UserTyping { chat_id: Uuid, user_id: Uuid },

    /// Presence transition. `last_seen` is set on the offline edge.
    #[serde(rename = "user:status")]
    UserStatus {
        user_id: Uuid,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    },
}

impl GatewayEvent {
    /// Chat this event is scoped to, if it is room-scoped.
    pub fn chat_id(&self) -> Option<Uuid> {
        match self {
            Self::MessageNew { message } => Some(message.chat_id),
            Self::MessageUpdated { chat_id, .. }
            | Self::MessageDeleted { chat_id, .. }
            | Self::MessageReactions { chat_id, .. }
            | Self::UserTyping { chat_id, .. } => Some(*chat_id),
            Self::Ready { .. } | Self::UserStatus { .. } => None,
        }
    }
}

/// Commands sent from a client to the server over the gateway socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the socket with the same bearer token REST uses.
    #[serde(rename = "identify")]
    Identify { token: String },

    /// Join the room for a chat the user is a member of. Membership is
    /// verified server-side; joins for foreign chats are ignored.
    #[serde(rename = "chat:join")]
    JoinChat { chat_id: Uuid },

    /// Typing signal, rebroadcast to the other room members. Bypasses
    /// persistence entirely.
    #[serde(rename = "user:typing")]
    Typing { chat_id: Uuid },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_wire_tags_are_stable() {
        let event = GatewayEvent::UserTyping {
            chat_id: Uuid::nil(),
            user_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "user:typing");

        let cmd = GatewayCommand::JoinChat { chat_id: Uuid::nil() };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "chat:join");
    }

    #[test]
    fn typing_event_is_chat_scoped_and_status_is_not() {
        let chat = Uuid::new_v4();
        let typing = GatewayEvent::UserTyping { chat_id: chat, user_id: Uuid::new_v4() };
        assert_eq!(typing.chat_id(), Some(chat));

        let status = GatewayEvent::UserStatus {
            user_id: Uuid::new_v4(),
            online: false,
            last_seen: None,
        };
        assert_eq!(status.chat_id(), None);
    }
}
