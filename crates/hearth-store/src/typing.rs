//! Typing tracker.  Rows are never swept; readers drop anything older than
//! the configured typing window.

use hearth_shared::constants::FALLBACK_TYPING_NAME;
use hearth_shared::types::{ConversationId, UserId};
use rusqlite::params;

use crate::conversations::require_member;
use crate::database::{col_user_id, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::TypingRecord;

impl Database {
    /// Record that `user_id` is typing in `conversation_id` right now,
    /// snapshotting their display name.
    pub fn set_typing(&self, conversation_id: ConversationId, user_id: &UserId) -> Result<()> {
        if self.get_conversation(conversation_id)?.is_none() {
            return Err(StoreError::NotFound("Conversation"));
        }
        require_member(self.conn(), conversation_id, user_id)?;

        let user_name = self
            .display_name_of(user_id)?
            .unwrap_or_else(|| FALLBACK_TYPING_NAME.to_string());
        let now = self.now_ms();

        self.conn().execute(
            "INSERT INTO typing (conversation_id, user_id, user_name, last_typing_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(conversation_id, user_id) DO UPDATE SET
                 user_name = excluded.user_name,
                 last_typing_at = excluded.last_typing_at",
            params![conversation_id.to_string(), user_id.as_str(), user_name, now],
        )?;

        self.emit(StoreEvent::TypingChanged {
            conversation_id,
            user_id: user_id.clone(),
        });
        Ok(())
    }

    /// Remove the typing record, if any.
    pub fn clear_typing(&self, conversation_id: ConversationId, user_id: &UserId) -> Result<()> {
        let removed = self.conn().execute(
            "DELETE FROM typing WHERE conversation_id = ?1 AND user_id = ?2",
            params![conversation_id.to_string(), user_id.as_str()],
        )?;

        if removed > 0 {
            self.emit(StoreEvent::TypingChanged {
                conversation_id,
                user_id: user_id.clone(),
            });
        }
        Ok(())
    }

    /// Typing records still inside the typing window, oldest first.
    pub fn list_typing(&self, conversation_id: ConversationId) -> Result<Vec<TypingRecord>> {
        let now = self.now_ms();
        let window = self.typing_window_ms();

        let mut stmt = self.conn().prepare(
            "SELECT conversation_id, user_id, user_name, last_typing_at
             FROM typing
             WHERE conversation_id = ?1
             ORDER BY last_typing_at ASC, user_id ASC",
        )?;
        let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
            Ok(TypingRecord {
                conversation_id: ConversationId(col_uuid(row, 0)?),
                user_id: col_user_id(row, 1)?,
                user_name: row.get(2)?,
                last_typing_at: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            let record = row?;
            if !record.is_expired(now, window) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::UserProfileInput;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn setup() -> (Database, Arc<ManualClock>, ConversationId) {
        let clock = Arc::new(ManualClock::new(1_000));
        let mut db = Database::open_in_memory()
            .unwrap()
            .with_clock(clock.clone())
            .with_typing_window_ms(3_000);
        let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
        (db, clock, conv)
    }

    fn raw_rows(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM typing", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn snapshot_name_falls_back() {
        let (db, _clock, conv) = setup();
        db.upsert_user(&UserProfileInput {
            user_id: "u1".into(),
            name: Some("Alex".into()),
            ..Default::default()
        })
        .unwrap();

        db.set_typing(conv, &uid("u1")).unwrap();
        db.set_typing(conv, &uid("u2")).unwrap();

        let records = db.list_typing(conv).unwrap();
        let names: Vec<_> = records.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["Alex", "User"]);
    }

    #[test]
    fn repeated_set_is_an_upsert() {
        let (db, clock, conv) = setup();
        db.set_typing(conv, &uid("u1")).unwrap();
        clock.advance(500);
        db.set_typing(conv, &uid("u1")).unwrap();

        assert_eq!(raw_rows(&db), 1);
        assert_eq!(db.list_typing(conv).unwrap()[0].last_typing_at, 1_500);
    }

    #[test]
    fn expired_rows_are_hidden_but_kept() {
        let (db, clock, conv) = setup();
        db.set_typing(conv, &uid("u1")).unwrap();

        clock.advance(3_000);
        assert_eq!(db.list_typing(conv).unwrap().len(), 1);

        clock.advance(1);
        assert!(db.list_typing(conv).unwrap().is_empty());
        assert_eq!(raw_rows(&db), 1);
    }

    #[test]
    fn clear_is_a_silent_no_op_when_absent() {
        let (db, _clock, conv) = setup();
        db.clear_typing(conv, &uid("u1")).unwrap();

        db.set_typing(conv, &uid("u1")).unwrap();
        db.clear_typing(conv, &uid("u1")).unwrap();
        assert_eq!(raw_rows(&db), 0);
    }

    #[test]
    fn set_requires_existing_conversation_and_membership() {
        let (db, _clock, conv) = setup();
        let err = db.set_typing(ConversationId::new(), &uid("u1")).unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Conversation")));

        let err = db.set_typing(conv, &uid("u9")).unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
    }
}
