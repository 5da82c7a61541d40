use rusqlite::Connection;

const UP_SQL: &str = r#"
-- Per-community protected terms. scope is 'default' for the bundled set
-- or a community id for community overrides.
CREATE TABLE IF NOT EXISTS glossary_terms (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    scope         TEXT NOT NULL,
    term          TEXT NOT NULL,
    category      TEXT NOT NULL,              -- technical|brand|proper_noun|custom
    preserve_case INTEGER NOT NULL DEFAULT 1, -- boolean 0/1
    created_at    TEXT NOT NULL,

    UNIQUE (scope, term)
);

CREATE INDEX IF NOT EXISTS idx_glossary_scope ON glossary_terms(scope);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
