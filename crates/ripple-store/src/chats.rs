use chrono::Utc;
use uuid::Uuid;

use ripple_db::models::{InboxRow, MemberRow};
use ripple_db::parse_timestamp;
use ripple_types::api::{ChatDetail, ChatSummary, FolderCounts, MessagePreview, UnreadCount};
use ripple_types::models::{ChatKind, ChatMember, ChatSettings, InboxEntry, InboxFolder};

use crate::error::{StoreError, StoreResult};
use crate::{ConversationStore, parse_uuid};

impl ConversationStore {
    /// Create-or-get a DM between two users. Idempotent: a second request
    /// with the same counterpart returns the existing chat, never a
    /// duplicate.
    ///
    /// Inbox seeding: the initiator always lands in Primary/accepted. The
    /// target lands in Requests/pending unless they already follow the
    /// initiator back, in which case Primary/accepted.
    pub fn create_or_get_dm(&self, initiator: Uuid, target: Uuid) -> StoreResult<ChatDetail> {
        if initiator == target {
            return Err(StoreError::InvalidMembers);
        }
        if self.db.get_user_by_id(&target.to_string())?.is_none() {
            return Err(StoreError::NotFound);
        }

        let follows_back = self.graph.follows(target, initiator)?;
        let (target_folder, target_accepted) = if follows_back {
            (InboxFolder::Primary, true)
        } else {
            (InboxFolder::Requests, false)
        };

        let now = Utc::now().to_rfc3339();
        let initiator_id = initiator.to_string();
        let target_id = target.to_string();
        // Lookup and insert share one transaction, so concurrent requests
        // for the same pair converge on a single chat.
        let chat_id = self.db.find_or_create_dm(
            &Uuid::new_v4().to_string(),
            &initiator_id,
            &target_id,
            &now,
            &[
                (initiator_id.as_str(), InboxFolder::Primary.as_str(), true),
                (target_id.as_str(), target_folder.as_str(), target_accepted),
            ],
        )?;

        self.get_chat(parse_uuid(&chat_id), initiator)
    }

    /// Chats the user belongs to, newest activity first, optionally filtered
    /// by the user's own inbox folder. Unread counts are computed here,
    /// server-side; clients never derive them by fetching message pages.
    pub fn list_chats(&self, user: Uuid, folder: Option<InboxFolder>) -> StoreResult<Vec<ChatSummary>> {
        let uid = user.to_string();
        let rows = self
            .db
            .list_chats_for_user(&uid, folder.map(|f| f.as_str()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (chat, inbox) in rows {
            let members = self
                .db
                .chat_members(&chat.id)?
                .into_iter()
                .map(member_from_row)
                .collect();
            let nickname = self.db.get_nickname(&chat.id, &uid)?;
            let unread_count = self.db.unread_count(&chat.id, &uid)?;
            let last_message = self
                .db
                .last_message_preview(&chat.id, &uid)?
                .map(|p| MessagePreview {
                    sender_id: parse_uuid(&p.sender_id),
                    content: p.content,
                    created_at: parse_timestamp(&p.created_at),
                });

            summaries.push(ChatSummary {
                id: parse_uuid(&chat.id),
                kind: parse_kind(&chat.kind),
                name: chat.name,
                members,
                folder: parse_folder(&inbox.folder),
                accepted: inbox.accepted,
                nickname,
                unread_count,
                last_activity_at: parse_timestamp(&chat.last_activity_at),
                last_message,
            });
        }
        Ok(summaries)
    }

    pub fn folder_counts(&self, user: Uuid) -> StoreResult<FolderCounts> {
        let uid = user.to_string();
        Ok(FolderCounts {
            primary: self.db.folder_count(&uid, InboxFolder::Primary.as_str())?,
            general: self.db.folder_count(&uid, InboxFolder::General.as_str())?,
            requests: self.db.folder_count(&uid, InboxFolder::Requests.as_str())?,
        })
    }

    /// Total chats holding unread messages, for the nav badge.
    pub fn total_unread_chats(&self, user: Uuid) -> StoreResult<UnreadCount> {
        Ok(UnreadCount {
            unread_chats: self.db.unread_chat_count(&user.to_string())?,
        })
    }

    /// Full detail including settings and every member's inbox entry. The
    /// viewer's own entry rides along at the top level.
    pub fn get_chat(&self, chat_id: Uuid, viewer: Uuid) -> StoreResult<ChatDetail> {
        let cid = chat_id.to_string();
        let vid = viewer.to_string();

        let chat = self.db.get_chat(&cid)?.ok_or(StoreError::NotFound)?;
        let my_inbox = self
            .db
            .inbox_entry(&cid, &vid)?
            .ok_or(StoreError::NotAMember)?;

        let members = self
            .db
            .chat_members(&cid)?
            .into_iter()
            .map(member_from_row)
            .collect();
        let inboxes = self
            .db
            .inbox_entries(&cid)?
            .into_iter()
            .map(inbox_from_row)
            .collect();
        let nickname = self.db.get_nickname(&cid, &vid)?;

        Ok(ChatDetail {
            id: parse_uuid(&chat.id),
            kind: parse_kind(&chat.kind),
            name: chat.name,
            members,
            settings: ChatSettings {
                disappearing_24h: chat.disappearing_24h,
                nickname,
            },
            inboxes,
            my_inbox: inbox_from_row(my_inbox),
            created_at: parse_timestamp(&chat.created_at),
        })
    }

    pub fn update_settings(
        &self,
        chat_id: Uuid,
        viewer: Uuid,
        disappearing_24h: Option<bool>,
        nickname: Option<&str>,
    ) -> StoreResult<ChatDetail> {
        let cid = chat_id.to_string();
        let vid = viewer.to_string();
        if !self.db.is_member(&cid, &vid)? {
            return Err(StoreError::NotAMember);
        }

        if let Some(enabled) = disappearing_24h {
            self.db.set_disappearing(&cid, enabled)?;
        }
        if let Some(nick) = nickname {
            self.db.set_nickname(&cid, &vid, nick)?;
        }

        self.get_chat(chat_id, viewer)
    }

    /// Self-targeted inbox mutation. Any member may relocate their own entry
    /// between folders; accept is one-way, and flipping a previously accepted
    /// entry back to pending is `Forbidden`.
    pub fn set_inbox_placement(
        &self,
        chat_id: Uuid,
        viewer: Uuid,
        folder: Option<InboxFolder>,
        accepted: Option<bool>,
    ) -> StoreResult<InboxEntry> {
        let cid = chat_id.to_string();
        let vid = viewer.to_string();

        let current = self
            .db
            .inbox_entry(&cid, &vid)?
            .ok_or(StoreError::NotAMember)?;

        let next_accepted = match accepted {
            Some(false) if current.accepted => return Err(StoreError::Forbidden),
            Some(value) => value,
            None => current.accepted,
        };
        // Accepting without a folder choice defaults to Primary.
        let next_folder = match folder {
            Some(f) => f,
            None if next_accepted && !current.accepted => InboxFolder::Primary,
            None => parse_folder(&current.folder),
        };

        self.db
            .update_inbox(&cid, &vid, next_folder.as_str(), next_accepted)?;

        Ok(InboxEntry {
            user_id: viewer,
            folder: next_folder,
            accepted: next_accepted,
        })
    }
}

pub(crate) fn member_from_row(row: MemberRow) -> ChatMember {
    ChatMember {
        user_id: parse_uuid(&row.user_id),
        username: row.username,
        display_name: row.display_name,
        profile_pic: row.profile_pic,
        last_seen: row.last_seen.as_deref().map(parse_timestamp),
    }
}

pub(crate) fn inbox_from_row(row: InboxRow) -> InboxEntry {
    InboxEntry {
        user_id: parse_uuid(&row.user_id),
        folder: parse_folder(&row.folder),
        accepted: row.accepted,
    }
}

pub(crate) fn parse_folder(raw: &str) -> InboxFolder {
    InboxFolder::parse(raw).unwrap_or(InboxFolder::Primary)
}

pub(crate) fn parse_kind(raw: &str) -> ChatKind {
    match raw {
        "group" => ChatKind::Group,
        _ => ChatKind::Dm,
    }
}
