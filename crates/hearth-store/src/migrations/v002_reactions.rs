use rusqlite::Connection;

const UP_SQL: &str = r#"
-- One row per (message, reaction key, user).  Keys are normally the
-- `u_`-prefixed codepoint encoding; legacy rows may hold the raw emoji.
CREATE TABLE IF NOT EXISTS message_reactions (
    message_id   TEXT NOT NULL,
    reaction_key TEXT NOT NULL,
    user_id      TEXT NOT NULL,

    PRIMARY KEY (message_id, reaction_key, user_id),
    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
