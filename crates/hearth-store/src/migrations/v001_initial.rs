//! v001 -- Initial schema creation.
//!
//! Creates `users`, `conversations`, `conversation_members` and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (local cache of identity-provider profiles)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY NOT NULL,    -- external identity
    name        TEXT,
    handle      TEXT,
    avatar_url  TEXT,
    created_at  INTEGER NOT NULL              -- unix ms
);

CREATE INDEX IF NOT EXISTS idx_users_name ON users(name);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id                  TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    is_group            INTEGER NOT NULL,           -- boolean 0/1
    members_key         TEXT NOT NULL,              -- sorted ids joined by '|'
    direct_key          TEXT,                       -- set only for direct lookups
    name                TEXT,
    created_at          INTEGER NOT NULL,
    last_message_text   TEXT,
    last_message_sender TEXT,
    last_message_at     INTEGER,
    message_seq         INTEGER NOT NULL DEFAULT 0  -- last assigned message seq
);

CREATE INDEX IF NOT EXISTS idx_conversations_members_key ON conversations(members_key);
-- NULLs are distinct, so only direct conversations take part.
CREATE UNIQUE INDEX IF NOT EXISTS idx_conversations_direct_key ON conversations(direct_key);

-- ----------------------------------------------------------------
-- Membership and read cursors
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversation_members (
    conversation_id TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    last_read_at    INTEGER NOT NULL DEFAULT 0,

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_members_user ON conversation_members(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id TEXT NOT NULL,
    seq             INTEGER NOT NULL,           -- per-conversation, monotonic
    sender_id       TEXT NOT NULL,
    text            TEXT NOT NULL,
    created_at      INTEGER NOT NULL,
    edited_at       INTEGER,
    deleted         INTEGER NOT NULL DEFAULT 0,

    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_conversation_seq
    ON messages(conversation_id, seq);
CREATE INDEX IF NOT EXISTS idx_messages_conversation_ts
    ON messages(conversation_id, created_at);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
