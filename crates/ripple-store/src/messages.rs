use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use ripple_db::models::{AttachmentRow, MessageRow};
use ripple_db::parse_timestamp;
use ripple_types::events::GatewayEvent;
use ripple_types::models::{Attachment, AttachmentKind, ChatKind, DeleteMode, Message, Reaction};

use crate::error::{StoreError, StoreResult};
use crate::{ConversationStore, READ_WINDOW, parse_uuid};

impl ConversationStore {
    /// Persist a message, bump the chat's activity marker, and emit
    /// `message:new` to the room.
    ///
    /// Gates, in order: the chat must exist, the sender must be a member,
    /// the message must carry content or attachments, and for a DM no block
    /// relationship may exist with the counterpart. A reply target must be a
    /// message in the same chat.
    pub fn send_message(
        &self,
        chat_id: Uuid,
        sender: Uuid,
        content: Option<&str>,
        attachments: &[Attachment],
        reply_to_message_id: Option<Uuid>,
    ) -> StoreResult<Message> {
        let cid = chat_id.to_string();
        let sid = sender.to_string();

        let chat = self.db.get_chat(&cid)?.ok_or(StoreError::NotFound)?;
        if !self.db.is_member(&cid, &sid)? {
            return Err(StoreError::NotAMember);
        }

        let content = content.map(str::trim).filter(|c| !c.is_empty());
        if content.is_none() && attachments.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        if chat.kind == ChatKind::Dm.as_str() {
            let members = self.db.chat_members(&cid)?;
            for member in &members {
                let other = parse_uuid(&member.user_id);
                if other != sender && self.graph.blocked_between(sender, other)? {
                    return Err(StoreError::Blocked);
                }
            }
        }

        if let Some(reply_to) = reply_to_message_id {
            let target = self
                .db
                .get_message(&reply_to.to_string())?
                .ok_or(StoreError::NotFound)?;
            if target.chat_id != cid {
                return Err(StoreError::NotFound);
            }
        }

        let message_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let attachment_rows: Vec<AttachmentRow> = attachments
            .iter()
            .map(|a| AttachmentRow {
                message_id: message_id.to_string(),
                kind: a.kind.as_str().to_string(),
                url: a.url.clone(),
                name: a.name.clone(),
            })
            .collect();

        self.db.insert_message(
            &message_id.to_string(),
            &cid,
            &sid,
            content,
            reply_to_message_id.map(|id| id.to_string()).as_deref(),
            &now,
            &attachment_rows,
        )?;

        let message = self.load_message(message_id)?;
        debug!("message {} sent to chat {}", message_id, chat_id);
        self.sink.publish(GatewayEvent::MessageNew {
            message: message.clone(),
        });
        Ok(message)
    }

    /// Recent messages most-recent-first. Rows the viewer deleted for
    /// themselves are filtered out at the query level.
    pub fn list_messages(&self, chat_id: Uuid, viewer: Uuid, limit: u32) -> StoreResult<Vec<Message>> {
        let cid = chat_id.to_string();
        let vid = viewer.to_string();
        if !self.db.is_member(&cid, &vid)? {
            return Err(StoreError::NotAMember);
        }

        let rows = self.db.list_messages(&cid, &vid, limit.min(200))?;
        self.assemble(rows)
    }

    /// Sender-only content edit. `edited_at` is set, `created_at` never
    /// changes. Last write wins; there is no concurrency token.
    pub fn edit_message(&self, message_id: Uuid, editor: Uuid, new_content: &str) -> StoreResult<Message> {
        let row = self
            .db
            .get_message(&message_id.to_string())?
            .ok_or(StoreError::NotFound)?;
        if row.sender_id != editor.to_string() {
            return Err(StoreError::Forbidden);
        }
        let trimmed = new_content.trim();
        if trimmed.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let edited_at = Utc::now();
        self.db
            .set_message_content(&message_id.to_string(), trimmed, &edited_at.to_rfc3339())?;

        let message = self.load_message(message_id)?;
        self.sink.publish(GatewayEvent::MessageUpdated {
            chat_id: message.chat_id,
            message_id,
            content: trimmed.to_string(),
            edited_at,
        });
        Ok(message)
    }

    /// Bulk delete.
    ///
    /// `ForEveryone` is all-or-nothing: if any id is missing the whole batch
    /// is `NotFound`, and if any id belongs to another sender the whole
    /// batch is `Forbidden`, so no partial state is ever visible to other
    /// members mid-batch. Emits `message:deleted` per affected chat.
    ///
    /// `ForMe` succeeds per-id by adding the requester to the suppression
    /// set, and emits nothing.
    pub fn delete_messages(&self, ids: &[Uuid], requester: Uuid, mode: DeleteMode) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        // Clients may repeat an id in a batch; collapse before the
        // missing-row check so duplicates don't read as absences.
        let mut id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        id_strings.sort_unstable();
        id_strings.dedup();
        let rows = self.db.get_messages_by_ids(&id_strings)?;
        if rows.len() != id_strings.len() {
            return Err(StoreError::NotFound);
        }

        match mode {
            DeleteMode::ForEveryone => {
                let rid = requester.to_string();
                if rows.iter().any(|row| row.sender_id != rid) {
                    return Err(StoreError::Forbidden);
                }
                self.hard_delete(&rows)?;
            }
            DeleteMode::ForMe => {
                let rid = requester.to_string();
                for row in &rows {
                    self.db.insert_suppression(&row.id, &rid)?;
                }
            }
        }
        Ok(())
    }

    /// Flip membership of (user, emoji) in the message's reaction set and
    /// emit `message:reactions` with the full updated list. Toggling the
    /// same pair twice round-trips to the original set.
    pub fn toggle_reaction(&self, message_id: Uuid, user: Uuid, emoji: &str) -> StoreResult<Vec<Reaction>> {
        let mid = message_id.to_string();
        let row = self.db.get_message(&mid)?.ok_or(StoreError::NotFound)?;
        if !self.db.is_member(&row.chat_id, &user.to_string())? {
            return Err(StoreError::NotAMember);
        }

        self.db
            .toggle_reaction(&mid, &user.to_string(), emoji, &Utc::now().to_rfc3339())?;

        let reactions: Vec<Reaction> = self
            .db
            .reactions_for_messages(std::slice::from_ref(&mid))?
            .into_iter()
            .map(|r| Reaction {
                user_id: parse_uuid(&r.user_id),
                emoji: r.emoji,
            })
            .collect();

        self.sink.publish(GatewayEvent::MessageReactions {
            chat_id: parse_uuid(&row.chat_id),
            message_id,
            reactions: reactions.clone(),
        });
        Ok(reactions)
    }

    /// Add the viewer to readBy for the recent window of the chat and reset
    /// their unread counter to zero. Returns how many rows were newly
    /// marked.
    pub fn mark_read(&self, chat_id: Uuid, viewer: Uuid) -> StoreResult<usize> {
        let cid = chat_id.to_string();
        let vid = viewer.to_string();
        if !self.db.is_member(&cid, &vid)? {
            return Err(StoreError::NotAMember);
        }
        Ok(self.db.mark_read(&cid, &vid, READ_WINDOW)?)
    }

    pub fn unread_count(&self, chat_id: Uuid, viewer: Uuid) -> StoreResult<u64> {
        Ok(self
            .db
            .unread_count(&chat_id.to_string(), &viewer.to_string())?)
    }

    /// Expiry sweep for disappearing messages: hard-deletes everything older
    /// than 24h in chats with the setting enabled, through the same path as
    /// delete-for-everyone. Invoked periodically by the server; cadence is
    /// the caller's concern.
    pub fn sweep_disappearing(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let cutoff = (now - Duration::hours(24)).to_rfc3339();
        let expired = self.db.expired_disappearing_messages(&cutoff)?;
        if expired.is_empty() {
            return Ok(0);
        }

        let ids: Vec<String> = expired.iter().map(|(_, mid)| mid.clone()).collect();
        let rows = self.db.get_messages_by_ids(&ids)?;
        let count = rows.len();
        self.hard_delete(&rows)?;
        info!("disappearing sweep removed {} messages", count);
        Ok(count)
    }

    /// Shared hard-delete path: removes the rows (dependents cascade) and
    /// emits one `message:deleted` per affected chat.
    fn hard_delete(&self, rows: &[MessageRow]) -> StoreResult<()> {
        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();
        self.db.delete_messages(&ids)?;

        let mut by_chat: HashMap<String, Vec<Uuid>> = HashMap::new();
        for row in rows {
            by_chat
                .entry(row.chat_id.clone())
                .or_default()
                .push(parse_uuid(&row.id));
        }
        for (chat_id, message_ids) in by_chat {
            self.sink.publish(GatewayEvent::MessageDeleted {
                chat_id: parse_uuid(&chat_id),
                message_ids,
            });
        }
        Ok(())
    }

    fn load_message(&self, id: Uuid) -> StoreResult<Message> {
        let row = self
            .db
            .get_message(&id.to_string())?
            .ok_or(StoreError::NotFound)?;
        let mut assembled = self.assemble(vec![row])?;
        assembled.pop().ok_or(StoreError::NotFound)
    }

    /// Attach reactions, readBy sets and attachments to message rows with
    /// three batch queries instead of per-row lookups.
    fn assemble(&self, rows: Vec<MessageRow>) -> StoreResult<Vec<Message>> {
        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

        let mut attachment_map: HashMap<String, Vec<Attachment>> = HashMap::new();
        for att in self.db.attachments_for_messages(&ids)? {
            attachment_map
                .entry(att.message_id.clone())
                .or_default()
                .push(Attachment {
                    kind: AttachmentKind::parse(&att.kind).unwrap_or(AttachmentKind::File),
                    url: att.url,
                    name: att.name,
                });
        }

        let mut reaction_map: HashMap<String, Vec<Reaction>> = HashMap::new();
        for r in self.db.reactions_for_messages(&ids)? {
            reaction_map
                .entry(r.message_id.clone())
                .or_default()
                .push(Reaction {
                    user_id: parse_uuid(&r.user_id),
                    emoji: r.emoji,
                });
        }

        let mut read_map: HashMap<String, Vec<Uuid>> = HashMap::new();
        for r in self.db.reads_for_messages(&ids)? {
            read_map
                .entry(r.message_id.clone())
                .or_default()
                .push(parse_uuid(&r.user_id));
        }

        Ok(rows
            .into_iter()
            .map(|row| Message {
                id: parse_uuid(&row.id),
                chat_id: parse_uuid(&row.chat_id),
                sender_id: parse_uuid(&row.sender_id),
                sender_name: row.sender_name,
                content: row.content,
                attachments: attachment_map.remove(&row.id).unwrap_or_default(),
                reply_to_message_id: row.reply_to_message_id.as_deref().map(parse_uuid),
                reactions: reaction_map.remove(&row.id).unwrap_or_default(),
                read_by: read_map.remove(&row.id).unwrap_or_default(),
                created_at: parse_timestamp(&row.created_at),
                edited_at: row.edited_at.as_deref().map(parse_timestamp),
            })
            .collect())
    }
}
