//! v001 -- Initial schema creation.
//!
//! Creates the core tables: `users`, `communities`, `community_members`,
//! `channels`, `threads`, `messages`, `translations`, and `reactions`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id               TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    email            TEXT NOT NULL UNIQUE,
    username         TEXT NOT NULL UNIQUE,
    password_hash    TEXT NOT NULL,              -- hex(salt)$hex(hash)
    primary_language TEXT NOT NULL,              -- ISO 639-1 code
    avatar           TEXT,
    status           TEXT,
    created_at       TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

-- ----------------------------------------------------------------
-- Communities and membership
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS communities (
    id          TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    name        TEXT NOT NULL,
    description TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS community_members (
    community_id TEXT NOT NULL,                  -- FK -> communities(id)
    user_id      TEXT NOT NULL,                  -- FK -> users(id)
    joined_at    TEXT NOT NULL,

    PRIMARY KEY (community_id, user_id),
    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Channels
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id           TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    community_id TEXT NOT NULL,                  -- FK -> communities(id)
    name         TEXT NOT NULL,
    description  TEXT,
    created_at   TEXT NOT NULL,

    FOREIGN KEY (community_id) REFERENCES communities(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_channels_community_id ON channels(community_id);

-- ----------------------------------------------------------------
-- Direct-message threads
-- ----------------------------------------------------------------
-- Participants are stored sorted (user_a < user_b) so the unique index
-- enforces at most one thread per unordered pair. The thread id doubles as
-- the channel id for messages posted into the conversation.
CREATE TABLE IF NOT EXISTS threads (
    id              TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    user_a          TEXT NOT NULL,               -- FK -> users(id), lower id
    user_b          TEXT NOT NULL,               -- FK -> users(id), higher id
    created_at      TEXT NOT NULL,
    last_message_at TEXT NOT NULL,

    FOREIGN KEY (user_a) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (user_b) REFERENCES users(id) ON DELETE CASCADE,
    UNIQUE (user_a, user_b)
);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
-- channel_id refers to channels(id) for community channels and threads(id)
-- for direct messages, so it carries no foreign key.
CREATE TABLE IF NOT EXISTS messages (
    id               TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    channel_id       TEXT NOT NULL,
    sender_id        TEXT NOT NULL,              -- FK -> users(id)
    content          TEXT NOT NULL,              -- original text, never rewritten
    source_language  TEXT NOT NULL,              -- detected at creation
    source_romanized INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    status           TEXT NOT NULL,              -- sent|translating|translated|failed
    timestamp        TEXT NOT NULL,              -- ISO-8601
    attachment       TEXT                        -- opaque JSON metadata
);

CREATE INDEX IF NOT EXISTS idx_messages_channel_ts
    ON messages(channel_id, timestamp DESC);

-- ----------------------------------------------------------------
-- Translations
-- ----------------------------------------------------------------
-- The primary key enforces at most one translation per target language.
CREATE TABLE IF NOT EXISTS translations (
    message_id         TEXT NOT NULL,            -- FK -> messages(id)
    target_language    TEXT NOT NULL,            -- ISO 639-1 code
    translated_content TEXT NOT NULL,
    created_at         TEXT NOT NULL,

    PRIMARY KEY (message_id, target_language),
    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Reactions
-- ----------------------------------------------------------------
-- One reaction per (message, user): a new emoji replaces the old one.
CREATE TABLE IF NOT EXISTS reactions (
    id         TEXT PRIMARY KEY NOT NULL,        -- UUID v4
    message_id TEXT NOT NULL,                    -- FK -> messages(id)
    user_id    TEXT NOT NULL,                    -- FK -> users(id)
    emoji      TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE,
    UNIQUE (message_id, user_id)
);

CREATE INDEX IF NOT EXISTS idx_reactions_message ON reactions(message_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
