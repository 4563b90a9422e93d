use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT,
            profile_pic     TEXT,
            last_seen       TEXT,
            created_at      TEXT NOT NULL
        );

        -- Denormalized mirror of the external social-graph subsystem.
        -- The chat core only ever reads these.
        CREATE TABLE IF NOT EXISTS follows (
            follower_id     TEXT NOT NULL REFERENCES users(id),
            followee_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (follower_id, followee_id)
        );

        CREATE TABLE IF NOT EXISTS blocks (
            blocker_id      TEXT NOT NULL REFERENCES users(id),
            blocked_id      TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (blocker_id, blocked_id)
        );

        CREATE TABLE IF NOT EXISTS chats (
            id                  TEXT PRIMARY KEY,
            kind                TEXT NOT NULL CHECK (kind IN ('dm', 'group')),
            name                TEXT,
            disappearing_24h    INTEGER NOT NULL DEFAULT 0,
            last_activity_at    TEXT NOT NULL,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_members (
            chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (chat_id, user_id)
        );

        -- Exactly one entry per (chat, member): the triage folder plus the
        -- one-way request/accept gate.
        CREATE TABLE IF NOT EXISTS chat_inboxes (
            chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            folder      TEXT NOT NULL CHECK (folder IN ('primary', 'general', 'requests')),
            accepted    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS chat_nicknames (
            chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            nickname    TEXT NOT NULL,
            PRIMARY KEY (chat_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id                      TEXT PRIMARY KEY,
            chat_id                 TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
            sender_id               TEXT NOT NULL REFERENCES users(id),
            content                 TEXT,
            reply_to_message_id     TEXT,
            created_at              TEXT NOT NULL,
            edited_at               TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages(chat_id, created_at);

        CREATE TABLE IF NOT EXISTS attachments (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            position    INTEGER NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('image', 'video', 'file')),
            url         TEXT NOT NULL,
            name        TEXT,
            PRIMARY KEY (message_id, position)
        );

        CREATE TABLE IF NOT EXISTS reactions (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            emoji       TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (message_id, user_id, emoji)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON reactions(message_id);

        -- The readBy set: grows monotonically, never shrinks.
        CREATE TABLE IF NOT EXISTS message_reads (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, user_id)
        );

        -- Delete-for-me suppression set, checked at read time.
        CREATE TABLE IF NOT EXISTS message_suppressions (
            message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (message_id, user_id)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
