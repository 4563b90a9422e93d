use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{
    AttachmentRow, ChatRow, InboxRow, MemberRow, MessageRow, PreviewRow, ReactionRow, ReadRow,
    UserRow,
};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        display_name: Option<&str>,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, username, password_hash, display_name, created_at],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, password, display_name, profile_pic, last_seen FROM users WHERE username = ?1", username)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(conn, "SELECT id, username, password, display_name, profile_pic, last_seen FROM users WHERE id = ?1", id)
        })
    }

    /// Denormalized presence field, written on gateway disconnect and read by
    /// REST for cold-start rendering.
    pub fn touch_last_seen(&self, user_id: &str, ts: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE users SET last_seen = ?2 WHERE id = ?1",
                params![user_id, ts],
            )?;
            Ok(())
        })
    }

    // -- Social graph mirror (read-only to the chat core) --

    pub fn follow_exists(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    params![follower_id, followee_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn block_exists(&self, blocker_id: &str, blocked_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM blocks WHERE blocker_id = ?1 AND blocked_id = ?2",
                    params![blocker_id, blocked_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn insert_follow(&self, follower_id: &str, followee_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followee_id) VALUES (?1, ?2)",
                params![follower_id, followee_id],
            )?;
            Ok(())
        })
    }

    pub fn insert_block(&self, blocker_id: &str, blocked_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO blocks (blocker_id, blocked_id) VALUES (?1, ?2)",
                params![blocker_id, blocked_id],
            )?;
            Ok(())
        })
    }

    // -- Chats --

    /// Find the DM containing exactly these two members, or create it with
    /// its members and seeded inbox entries. DMs always have exactly two
    /// members, so two EXISTS checks suffice. Lookup and insert run in one
    /// transaction under a single lock acquisition, so two concurrent
    /// requests for the same pair can never both insert. Returns the id of
    /// the surviving chat, existing or new.
    pub fn find_or_create_dm(
        &self,
        id: &str,
        user_a: &str,
        user_b: &str,
        created_at: &str,
        members: &[(&str, &str, bool)], // (user_id, folder, accepted)
    ) -> Result<String> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    "SELECT c.id FROM chats c
                     WHERE c.kind = 'dm'
                       AND EXISTS (SELECT 1 FROM chat_members WHERE chat_id = c.id AND user_id = ?1)
                       AND EXISTS (SELECT 1 FROM chat_members WHERE chat_id = c.id AND user_id = ?2)
                     LIMIT 1",
                    params![user_a, user_b],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(existing);
            }

            tx.execute(
                "INSERT INTO chats (id, kind, name, last_activity_at, created_at)
                 VALUES (?1, 'dm', NULL, ?2, ?2)",
                params![id, created_at],
            )?;
            for (user_id, folder, accepted) in members {
                tx.execute(
                    "INSERT INTO chat_members (chat_id, user_id) VALUES (?1, ?2)",
                    params![id, user_id],
                )?;
                tx.execute(
                    "INSERT INTO chat_inboxes (chat_id, user_id, folder, accepted)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, user_id, folder, accepted],
                )?;
            }
            tx.commit()?;
            Ok(id.to_string())
        })
    }

    pub fn get_chat(&self, id: &str) -> Result<Option<ChatRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, kind, name, disappearing_24h, last_activity_at, created_at
                     FROM chats WHERE id = ?1",
                    [id],
                    map_chat_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn is_member(&self, chat_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM chat_members WHERE chat_id = ?1 AND user_id = ?2",
                    params![chat_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn chat_ids_for_user(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT chat_id FROM chat_members WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Everyone who shares at least one chat with the user. Drives the
    /// presence replay on gateway connect.
    pub fn co_member_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT cm2.user_id FROM chat_members cm1
                 JOIN chat_members cm2 ON cm2.chat_id = cm1.chat_id
                 WHERE cm1.user_id = ?1 AND cm2.user_id != ?1",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Members with their denormalized profile fields, joined in one query.
    pub fn chat_members(&self, chat_id: &str) -> Result<Vec<MemberRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.display_name, u.profile_pic, u.last_seen
                 FROM chat_members cm
                 JOIN users u ON u.id = cm.user_id
                 WHERE cm.chat_id = ?1
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([chat_id], |row| {
                    Ok(MemberRow {
                        user_id: row.get(0)?,
                        username: row.get(1)?,
                        display_name: row.get(2)?,
                        profile_pic: row.get(3)?,
                        last_seen: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn inbox_entries(&self, chat_id: &str) -> Result<Vec<InboxRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, user_id, folder, accepted FROM chat_inboxes WHERE chat_id = ?1",
            )?;
            let rows = stmt
                .query_map([chat_id], map_inbox_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn inbox_entry(&self, chat_id: &str, user_id: &str) -> Result<Option<InboxRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT chat_id, user_id, folder, accepted FROM chat_inboxes
                     WHERE chat_id = ?1 AND user_id = ?2",
                    params![chat_id, user_id],
                    map_inbox_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn update_inbox(
        &self,
        chat_id: &str,
        user_id: &str,
        folder: &str,
        accepted: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE chat_inboxes SET folder = ?3, accepted = ?4
                 WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id, user_id, folder, accepted],
            )?;
            Ok(())
        })
    }

    pub fn get_nickname(&self, chat_id: &str, user_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let nickname: Option<String> = conn
                .query_row(
                    "SELECT nickname FROM chat_nicknames WHERE chat_id = ?1 AND user_id = ?2",
                    params![chat_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(nickname)
        })
    }

    pub fn set_nickname(&self, chat_id: &str, user_id: &str, nickname: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chat_nicknames (chat_id, user_id, nickname) VALUES (?1, ?2, ?3)
                 ON CONFLICT(chat_id, user_id) DO UPDATE SET nickname = excluded.nickname",
                params![chat_id, user_id, nickname],
            )?;
            Ok(())
        })
    }

    pub fn set_disappearing(&self, chat_id: &str, enabled: bool) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE chats SET disappearing_24h = ?2 WHERE id = ?1",
                params![chat_id, enabled],
            )?;
            Ok(())
        })
    }

    /// Chats the user belongs to, newest activity first, with the user's own
    /// inbox entry. Optionally filtered to a single folder.
    pub fn list_chats_for_user(
        &self,
        user_id: &str,
        folder: Option<&str>,
    ) -> Result<Vec<(ChatRow, InboxRow)>> {
        self.with_conn(|conn| {
            let sql = "SELECT c.id, c.kind, c.name, c.disappearing_24h, c.last_activity_at, c.created_at,
                              i.chat_id, i.user_id, i.folder, i.accepted
                       FROM chats c
                       JOIN chat_members cm ON cm.chat_id = c.id AND cm.user_id = ?1
                       JOIN chat_inboxes i ON i.chat_id = c.id AND i.user_id = ?1
                       WHERE (?2 IS NULL OR i.folder = ?2)
                       ORDER BY c.last_activity_at DESC";
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(params![user_id, folder], |row| {
                    Ok((
                        ChatRow {
                            id: row.get(0)?,
                            kind: row.get(1)?,
                            name: row.get(2)?,
                            disappearing_24h: row.get(3)?,
                            last_activity_at: row.get(4)?,
                            created_at: row.get(5)?,
                        },
                        InboxRow {
                            chat_id: row.get(6)?,
                            user_id: row.get(7)?,
                            folder: row.get(8)?,
                            accepted: row.get(9)?,
                        },
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn folder_count(&self, user_id: &str, folder: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_inboxes WHERE user_id = ?1 AND folder = ?2",
                params![user_id, folder],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        chat_id: &str,
        sender_id: &str,
        content: Option<&str>,
        reply_to_message_id: Option<&str>,
        created_at: &str,
        attachments: &[AttachmentRow],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content, reply_to_message_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, chat_id, sender_id, content, reply_to_message_id, created_at],
            )?;
            for (position, att) in attachments.iter().enumerate() {
                tx.execute(
                    "INSERT INTO attachments (message_id, position, kind, url, name)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![id, position as i64, att.kind, att.url, att.name],
                )?;
            }
            tx.execute(
                "UPDATE chats SET last_activity_at = ?2 WHERE id = ?1",
                params![chat_id, created_at],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
                    [id],
                    map_message_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Batch metadata fetch for bulk-delete ownership checks.
    pub fn get_messages_by_ids(&self, ids: &[String]) -> Result<Vec<MessageRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!("{MESSAGE_SELECT} WHERE m.id IN ({})", placeholders(ids.len()));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Recent messages most-recent-first, excluding rows the viewer has
    /// deleted for themselves.
    pub fn list_messages(&self, chat_id: &str, viewer_id: &str, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT}
                 WHERE m.chat_id = ?1
                   AND NOT EXISTS (SELECT 1 FROM message_suppressions s
                                   WHERE s.message_id = m.id AND s.user_id = ?2)
                 ORDER BY m.created_at DESC
                 LIMIT ?3"
            ))?;
            let rows = stmt
                .query_map(params![chat_id, viewer_id, limit], map_message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Preview of the newest message visible to the viewer, for the inbox row.
    pub fn last_message_preview(&self, chat_id: &str, viewer_id: &str) -> Result<Option<PreviewRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT m.sender_id, m.content, m.created_at FROM messages m
                     WHERE m.chat_id = ?1
                       AND NOT EXISTS (SELECT 1 FROM message_suppressions s
                                       WHERE s.message_id = m.id AND s.user_id = ?2)
                     ORDER BY m.created_at DESC
                     LIMIT 1",
                    params![chat_id, viewer_id],
                    |row| {
                        Ok(PreviewRow {
                            sender_id: row.get(0)?,
                            content: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    pub fn set_message_content(&self, id: &str, content: &str, edited_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE messages SET content = ?2, edited_at = ?3 WHERE id = ?1",
                params![id, content, edited_at],
            )?;
            Ok(())
        })
    }

    /// Hard delete. Reactions, reads, suppressions and attachments go with
    /// the rows via ON DELETE CASCADE. All-or-nothing: single transaction.
    pub fn delete_messages(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let sql = format!("DELETE FROM messages WHERE id IN ({})", placeholders(ids.len()));
            tx.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn insert_suppression(&self, message_id: &str, user_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO message_suppressions (message_id, user_id) VALUES (?1, ?2)",
                params![message_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Messages past the disappearing-window cutoff in chats that have the
    /// setting enabled. Input to the expiry sweep.
    pub fn expired_disappearing_messages(&self, cutoff: &str) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.chat_id, m.id FROM messages m
                 JOIN chats c ON c.id = m.chat_id
                 WHERE c.disappearing_24h = 1 AND m.created_at < ?1",
            )?;
            let rows = stmt
                .query_map([cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reactions --

    /// Toggle membership of (user, emoji) on a message.
    /// Returns true if the reaction was added, false if removed.
    pub fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
        created_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                params![message_id, user_id, emoji],
            )?;
            if removed > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO reactions (message_id, user_id, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![message_id, user_id, emoji, created_at],
            )?;
            Ok(true)
        })
    }

    pub fn reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT message_id, user_id, emoji FROM reactions
                 WHERE message_id IN ({})
                 ORDER BY created_at",
                placeholders(message_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(message_ids.iter()), |row| {
                    Ok(ReactionRow {
                        message_id: row.get(0)?,
                        user_id: row.get(1)?,
                        emoji: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn attachments_for_messages(&self, message_ids: &[String]) -> Result<Vec<AttachmentRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT message_id, kind, url, name FROM attachments
                 WHERE message_id IN ({})
                 ORDER BY message_id, position",
                placeholders(message_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(message_ids.iter()), |row| {
                    Ok(AttachmentRow {
                        message_id: row.get(0)?,
                        kind: row.get(1)?,
                        url: row.get(2)?,
                        name: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Reads --

    pub fn reads_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReadRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT message_id, user_id FROM message_reads WHERE message_id IN ({})",
                placeholders(message_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(message_ids.iter()), |row| {
                    Ok(ReadRow {
                        message_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Insert the viewer into readBy for the most recent `window` messages of
    /// the chat. Bounded so a mark-all-read never does unbounded writes.
    /// Returns the number of rows newly marked.
    pub fn mark_read(&self, chat_id: &str, user_id: &str, window: u32) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO message_reads (message_id, user_id)
                 SELECT id, ?2 FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?3",
                params![chat_id, user_id, window],
            )?;
            Ok(n)
        })
    }

    /// Unread = messages from others the viewer has neither read nor
    /// suppressed.
    pub fn unread_count(&self, chat_id: &str, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 WHERE m.chat_id = ?1 AND m.sender_id != ?2
                   AND NOT EXISTS (SELECT 1 FROM message_reads r
                                   WHERE r.message_id = m.id AND r.user_id = ?2)
                   AND NOT EXISTS (SELECT 1 FROM message_suppressions s
                                   WHERE s.message_id = m.id AND s.user_id = ?2)",
                params![chat_id, user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Number of the user's chats holding at least one unread message.
    pub fn unread_chat_count(&self, user_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM chat_members cm
                 WHERE cm.user_id = ?1
                   AND EXISTS (SELECT 1 FROM messages m
                               WHERE m.chat_id = cm.chat_id AND m.sender_id != ?1
                                 AND NOT EXISTS (SELECT 1 FROM message_reads r
                                                 WHERE r.message_id = m.id AND r.user_id = ?1)
                                 AND NOT EXISTS (SELECT 1 FROM message_suppressions s
                                                 WHERE s.message_id = m.id AND s.user_id = ?1))",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

const MESSAGE_SELECT: &str =
    "SELECT m.id, m.chat_id, m.sender_id, u.username, m.content, m.reply_to_message_id,
            m.created_at, m.edited_at
     FROM messages m
     LEFT JOIN users u ON u.id = m.sender_id";

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_name: row
            .get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "unknown".to_string()),
        content: row.get(4)?,
        reply_to_message_id: row.get(5)?,
        created_at: row.get(6)?,
        edited_at: row.get(7)?,
    })
}

fn map_chat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRow> {
    Ok(ChatRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        name: row.get(2)?,
        disappearing_24h: row.get(3)?,
        last_activity_at: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_inbox_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InboxRow> {
    Ok(InboxRow {
        chat_id: row.get(0)?,
        user_id: row.get(1)?,
        folder: row.get(2)?,
        accepted: row.get(3)?,
    })
}

fn query_user(conn: &Connection, sql: &str, key: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(sql, [key], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                profile_pic: row.get(4)?,
                last_seen: row.get(5)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
