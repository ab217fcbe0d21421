//! Message ledger: append, list and tombstone messages.

use std::collections::{BTreeMap, BTreeSet};

use hearth_shared::types::{ConversationId, MessageId, UserId};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::conversations::require_member;
use crate::database::{col_user_id, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::Message;

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, seq, sender_id, text, created_at, edited_at, deleted";

impl Database {
    /// Append a message and patch the conversation's last-message summary in
    /// the same transaction.
    pub fn send(
        &mut self,
        conversation_id: ConversationId,
        sender_id: &UserId,
        text: &str,
    ) -> Result<MessageId> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(StoreError::Validation("Message text is required".into()));
        }
        let now = self.now_ms();

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        require_member(&tx, conversation_id, sender_id)?;
        let id = insert_message(&tx, conversation_id, sender_id, trimmed, now)?;
        patch_last_message(&tx, conversation_id, sender_id, trimmed, now)?;
        tx.commit()?;

        tracing::debug!(
            conversation_id = %conversation_id,
            message_id = %id,
            sender_id = %sender_id,
            "message sent"
        );
        self.emit(StoreEvent::MessageCreated {
            conversation_id,
            message_id: id,
        });
        self.emit(StoreEvent::ConversationUpdated { conversation_id });
        Ok(id)
    }

    /// All messages of a conversation, oldest first, tombstones included.
    /// Same-millisecond messages keep their send order.
    pub fn list_by_conversation(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        let tx = self.conn().unchecked_transaction()?;

        let mut reactions = reactions_for_conversation(&tx, conversation_id)?;
        let messages = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, seq ASC"
            ))?;
            let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;

            let mut messages = Vec::new();
            for row in rows {
                let mut message = row?;
                if let Some(map) = reactions.remove(&message.id) {
                    message.reactions = map;
                }
                messages.push(message);
            }
            messages
        };
        tx.commit()?;

        Ok(messages)
    }

    pub fn get_message(&self, id: MessageId) -> Result<Option<Message>> {
        load_message(self.conn(), id)
    }

    /// Tombstone a message: clear its text and mark it deleted.  Only the
    /// original sender may do this.  Reactions are left as they are.
    pub fn delete_message(&self, id: MessageId, user_id: &UserId) -> Result<()> {
        let (conversation_id, sender_id) = self
            .conn()
            .query_row(
                "SELECT conversation_id, sender_id FROM messages WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((col_uuid(row, 0)?, col_user_id(row, 1)?)),
            )
            .optional()?
            .ok_or(StoreError::NotFound("Message"))?;

        if sender_id != *user_id {
            tracing::warn!(message_id = %id, user_id = %user_id, "delete refused for non-sender");
            return Err(StoreError::AccessDenied(
                "Only the sender can delete this message".into(),
            ));
        }

        self.conn().execute(
            "UPDATE messages SET deleted = 1, text = '' WHERE id = ?1",
            params![id.to_string()],
        )?;

        self.emit(StoreEvent::MessageUpdated {
            conversation_id: ConversationId(conversation_id),
            message_id: id,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a message row, assigning the next per-conversation sequence number.
/// Must run inside a write transaction.
pub(crate) fn insert_message(
    conn: &Connection,
    conversation_id: ConversationId,
    sender_id: &UserId,
    text: &str,
    created_at: i64,
) -> Result<MessageId> {
    let affected = conn.execute(
        "UPDATE conversations SET message_seq = message_seq + 1 WHERE id = ?1",
        params![conversation_id.to_string()],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound("Conversation"));
    }
    let seq: i64 = conn.query_row(
        "SELECT message_seq FROM conversations WHERE id = ?1",
        params![conversation_id.to_string()],
        |row| row.get(0),
    )?;

    let id = MessageId::new();
    conn.execute(
        "INSERT INTO messages (id, conversation_id, seq, sender_id, text, created_at, deleted)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
        params![
            id.to_string(),
            conversation_id.to_string(),
            seq,
            sender_id.as_str(),
            text,
            created_at,
        ],
    )?;
    Ok(id)
}

pub(crate) fn patch_last_message(
    conn: &Connection,
    conversation_id: ConversationId,
    sender_id: &UserId,
    text: &str,
    created_at: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE conversations
         SET last_message_text = ?2, last_message_sender = ?3, last_message_at = ?4
         WHERE id = ?1",
        params![conversation_id.to_string(), text, sender_id.as_str(), created_at],
    )?;
    Ok(())
}

/// Load one message with its reactions.
pub(crate) fn load_message(conn: &Connection, id: MessageId) -> Result<Option<Message>> {
    let message = conn
        .query_row(
            &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
            params![id.to_string()],
            row_to_message,
        )
        .optional()?;

    let Some(mut message) = message else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT reaction_key, user_id FROM message_reactions WHERE message_id = ?1",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok((row.get::<_, String>(0)?, col_user_id(row, 1)?))
    })?;
    for row in rows {
        let (key, user) = row?;
        message.reactions.entry(key).or_default().insert(user);
    }

    Ok(Some(message))
}

type ReactionMap = BTreeMap<String, BTreeSet<UserId>>;

fn reactions_for_conversation(
    conn: &Connection,
    conversation_id: ConversationId,
) -> Result<BTreeMap<MessageId, ReactionMap>> {
    let mut stmt = conn.prepare(
        "SELECT r.message_id, r.reaction_key, r.user_id
         FROM message_reactions r
         JOIN messages m ON m.id = r.message_id
         WHERE m.conversation_id = ?1",
    )?;
    let rows = stmt.query_map(params![conversation_id.to_string()], |row| {
        Ok((
            MessageId(col_uuid(row, 0)?),
            row.get::<_, String>(1)?,
            col_user_id(row, 2)?,
        ))
    })?;

    let mut out: BTreeMap<MessageId, ReactionMap> = BTreeMap::new();
    for row in rows {
        let (message_id, key, user) = row?;
        out.entry(message_id)
            .or_default()
            .entry(key)
            .or_default()
            .insert(user);
    }
    Ok(out)
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId(col_uuid(row, 0)?),
        conversation_id: ConversationId(col_uuid(row, 1)?),
        seq: row.get(2)?,
        sender_id: col_user_id(row, 3)?,
        text: row.get(4)?,
        created_at: row.get(5)?,
        edited_at: row.get(6)?,
        deleted: row.get(7)?,
        reactions: BTreeMap::new(),
    })
}
