use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS presence (
    user_id      TEXT PRIMARY KEY NOT NULL,
    online       INTEGER NOT NULL,          -- boolean 0/1
    last_seen_at INTEGER NOT NULL
);

-- Expired rows are never swept here; readers filter by age.
CREATE TABLE IF NOT EXISTS typing (
    conversation_id TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    user_name       TEXT NOT NULL,          -- display name snapshot
    last_typing_at  INTEGER NOT NULL,

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
