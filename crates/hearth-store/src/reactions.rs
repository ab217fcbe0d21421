//! Per-message emoji reactions, stored under encoded reaction keys.

use hearth_shared::reaction;
use hearth_shared::types::{ConversationId, MessageId, UserId};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;

impl Database {
    /// Add `user_id` to the reaction set for `emoji`, or remove them if they
    /// are already in it.  Returns whether the user now has the reaction.
    ///
    /// Legacy plain-emoji keys on the message are folded into their encoded
    /// form first, so one emoji never lives under two keys.
    pub fn toggle_reaction(
        &mut self,
        message_id: MessageId,
        user_id: &UserId,
        emoji: &str,
    ) -> Result<bool> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Err(StoreError::Validation("Reaction emoji is required".into()));
        }
        let key = reaction::encode(emoji);

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let conversation_id = tx
            .query_row(
                "SELECT conversation_id FROM messages WHERE id = ?1",
                params![message_id.to_string()],
                |row| col_uuid(row, 0),
            )
            .optional()?
            .map(ConversationId)
            .ok_or(StoreError::NotFound("Message"))?;

        normalize_legacy_keys(&tx, message_id)?;

        let removed = tx.execute(
            "DELETE FROM message_reactions
             WHERE message_id = ?1 AND reaction_key = ?2 AND user_id = ?3",
            params![message_id.to_string(), key, user_id.as_str()],
        )?;
        let added = removed == 0;
        if added {
            tx.execute(
                "INSERT INTO message_reactions (message_id, reaction_key, user_id)
                 VALUES (?1, ?2, ?3)",
                params![message_id.to_string(), key, user_id.as_str()],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            message_id = %message_id,
            user_id = %user_id,
            reaction_key = %key,
            added,
            "reaction toggled"
        );
        self.emit(StoreEvent::MessageUpdated {
            conversation_id,
            message_id,
        });
        Ok(added)
    }
}

/// Rewrite every un-prefixed key on `message_id` to its encoded form,
/// merging user sets when both forms are present.
fn normalize_legacy_keys(conn: &Connection, message_id: MessageId) -> Result<()> {
    let legacy: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT reaction_key FROM message_reactions WHERE message_id = ?1",
        )?;
        let rows = stmt.query_map(params![message_id.to_string()], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<String>>>()?
            .into_iter()
            .filter(|key| !reaction::is_encoded(key))
            .collect()
    };

    for old_key in legacy {
        let new_key = reaction::normalize(&old_key);
        conn.execute(
            "INSERT OR IGNORE INTO message_reactions (message_id, reaction_key, user_id)
             SELECT message_id, ?3, user_id FROM message_reactions
             WHERE message_id = ?1 AND reaction_key = ?2",
            params![message_id.to_string(), old_key, new_key],
        )?;
        conn.execute(
            "DELETE FROM message_reactions WHERE message_id = ?1 AND reaction_key = ?2",
            params![message_id.to_string(), old_key],
        )?;
        tracing::debug!(message_id = %message_id, %old_key, %new_key, "legacy reaction key normalized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn setup() -> (Database, MessageId) {
        let mut db = Database::open_in_memory().unwrap();
        let conv = db.find_or_create_direct(&uid("u1"), &uid("u2")).unwrap();
        let message = db.send(conv, &uid("u1"), "react to me").unwrap();
        (db, message)
    }

    fn insert_legacy(db: &Database, message: MessageId, key: &str, user: &str) {
        db.conn()
            .execute(
                "INSERT INTO message_reactions (message_id, reaction_key, user_id)
                 VALUES (?1, ?2, ?3)",
                params![message.to_string(), key, user],
            )
            .unwrap();
    }

    #[test]
    fn toggle_twice_restores_original_state() {
        let (mut db, message) = setup();

        assert!(db.toggle_reaction(message, &uid("u2"), "❤️").unwrap());
        let m = db.get_message(message).unwrap().unwrap();
        assert_eq!(m.reactions["u_2764_fe0f"], BTreeSet::from([uid("u2")]));

        assert!(!db.toggle_reaction(message, &uid("u2"), "❤️").unwrap());
        let m = db.get_message(message).unwrap().unwrap();
        assert!(!m.has_reaction(&uid("u2"), "❤️"));
        assert!(m.reactions.is_empty());
    }

    #[test]
    fn users_share_a_key() {
        let (mut db, message) = setup();
        db.toggle_reaction(message, &uid("u1"), "👍").unwrap();
        db.toggle_reaction(message, &uid("u2"), "👍").unwrap();
        db.toggle_reaction(message, &uid("u2"), "👍🏽").unwrap();

        let m = db.get_message(message).unwrap().unwrap();
        assert_eq!(m.reactions.len(), 2);
        assert_eq!(m.reactions["u_1f44d"], BTreeSet::from([uid("u1"), uid("u2")]));
        assert_eq!(m.reactions["u_1f44d_1f3fd"], BTreeSet::from([uid("u2")]));
    }

    #[test]
    fn legacy_keys_are_merged_before_toggling() {
        let (mut db, message) = setup();
        insert_legacy(&db, message, "👍", "u1");
        insert_legacy(&db, message, "🔥", "u2");

        // u2 joins the thumbs-up set that so far only exists in legacy form.
        assert!(db.toggle_reaction(message, &uid("u2"), "👍").unwrap());

        let m = db.get_message(message).unwrap().unwrap();
        assert!(m.reactions.keys().all(|k| reaction::is_encoded(k)));
        assert_eq!(m.reactions["u_1f44d"], BTreeSet::from([uid("u1"), uid("u2")]));
        assert_eq!(m.reactions["u_1f525"], BTreeSet::from([uid("u2")]));
    }

    #[test]
    fn legacy_toggle_off_removes_user() {
        let (mut db, message) = setup();
        insert_legacy(&db, message, "🎉", "u1");

        assert!(!db.toggle_reaction(message, &uid("u1"), "🎉").unwrap());
        let m = db.get_message(message).unwrap().unwrap();
        assert!(m.reactions.is_empty());
    }

    #[test]
    fn unknown_message_is_not_found() {
        let (mut db, _message) = setup();
        let err = db
            .toggle_reaction(MessageId::new(), &uid("u1"), "👍")
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Message")));
    }

    #[test]
    fn blank_emoji_is_rejected() {
        let (mut db, message) = setup();
        let err = db.toggle_reaction(message, &uid("u1"), "  ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn deleted_messages_still_accept_reactions() {
        let (mut db, message) = setup();
        db.delete_message(message, &uid("u1")).unwrap();
        assert!(db.toggle_reaction(message, &uid("u2"), "😢").unwrap());
    }
}
