//! Conversation directory: creation, direct-conversation dedup, read
//! cursors and the per-user conversation list.

use std::collections::BTreeMap;

use hearth_shared::types::{canonical_members, members_key, ConversationId, UserId};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::database::{col_user_id, col_uuid, Database};
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::{Conversation, ConversationSummary, ConversationView, LastMessage};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Return the direct conversation between `user_a` and `user_b`,
    /// creating it on first use.  Safe to repeat and to race: the check and
    /// insert run in one IMMEDIATE transaction backed by a unique index on
    /// the direct key, and a lost race re-reads the winner's row.
    pub fn find_or_create_direct(
        &mut self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<ConversationId> {
        let members = canonical_members([user_a.clone(), user_b.clone()]);
        if members.len() != 2 {
            return Err(StoreError::Validation(
                "Direct message conversations require two distinct members".into(),
            ));
        }
        let key = members_key(&members);
        let now = self.now_ms();

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(existing) = find_direct(&tx, &key)? {
            tx.commit()?;
            return Ok(existing);
        }

        let id = ConversationId::new();
        let inserted = tx.execute(
            "INSERT INTO conversations (id, is_group, members_key, direct_key, name, created_at)
             VALUES (?1, 0, ?2, ?2, NULL, ?3)
             ON CONFLICT(direct_key) DO NOTHING",
            params![id.to_string(), key, now],
        )?;

        if inserted == 0 {
            let winner = find_direct(&tx, &key)?.ok_or_else(|| {
                StoreError::Conflict(format!("direct conversation {key} vanished during insert"))
            })?;
            tx.commit()?;
            tracing::debug!(members_key = %key, "direct conversation already existed");
            return Ok(winner);
        }

        insert_members(&tx, id, &members)?;
        tx.commit()?;

        tracing::info!(conversation_id = %id, members_key = %key, "direct conversation created");
        self.emit(StoreEvent::ConversationCreated { conversation_id: id });
        Ok(id)
    }

    /// Create a conversation for `member_ids`.  Never deduplicated; a call
    /// with exactly two distinct members yields a non-group conversation
    /// that is separate from the one [`find_or_create_direct`] manages.
    ///
    /// [`find_or_create_direct`]: Database::find_or_create_direct
    pub fn create_group(
        &mut self,
        member_ids: &[UserId],
        name: Option<&str>,
    ) -> Result<ConversationId> {
        let members = canonical_members(member_ids.iter().cloned());
        if members.len() < hearth_shared::constants::MIN_CONVERSATION_MEMBERS {
            return Err(StoreError::Validation(
                "Conversation must include at least two members".into(),
            ));
        }
        let is_group = members.len() > 2;
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        let key = members_key(&members);
        let now = self.now_ms();
        let id = ConversationId::new();

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO conversations (id, is_group, members_key, direct_key, name, created_at)
             VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
            params![id.to_string(), is_group, key, name, now],
        )?;
        insert_members(&tx, id, &members)?;
        tx.commit()?;

        tracing::info!(
            conversation_id = %id,
            member_count = members.len(),
            is_group,
            "conversation created"
        );
        self.emit(StoreEvent::ConversationCreated { conversation_id: id });
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Raw conversation record, no access check.
    pub fn get_conversation(&self, id: ConversationId) -> Result<Option<Conversation>> {
        load_conversation(self.conn(), id)
    }

    /// Conversation with display title and subtitle, or `None` when it does
    /// not exist or `user_id` is not a member.
    pub fn get_details(
        &self,
        id: ConversationId,
        user_id: &UserId,
    ) -> Result<Option<ConversationView>> {
        let tx = self.conn().unchecked_transaction()?;

        let Some(conversation) = load_conversation(&tx, id)? else {
            return Ok(None);
        };
        if !conversation.is_member(user_id) {
            return Ok(None);
        }

        let (title, subtitle) = if conversation.is_group {
            (
                conversation.group_label(),
                format!("{} members", conversation.members.len()),
            )
        } else {
            let peer = conversation.peer_of(user_id);
            let title = match peer {
                Some(peer) => self.display_name_of(peer)?,
                None => None,
            }
            .unwrap_or_else(|| "Direct chat".to_string());

            let presence = match peer {
                Some(peer) => self.get_presence(peer)?,
                None => None,
            };
            let subtitle = match presence {
                Some(p) if p.online => "Online",
                Some(_) => "Offline",
                None => "Unknown",
            };
            (title, subtitle.to_string())
        };

        tx.commit()?;
        Ok(Some(ConversationView {
            conversation,
            title,
            subtitle,
        }))
    }

    /// Every conversation `user_id` belongs to, newest activity first, with
    /// the unread count for that user.  Reads one consistent snapshot.
    pub fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ConversationSummary>> {
        let tx = self.conn().unchecked_transaction()?;

        let ids = {
            let mut stmt = tx.prepare(
                "SELECT conversation_id FROM conversation_members WHERE user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user_id.as_str()], |row| col_uuid(row, 0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut summaries = Vec::with_capacity(ids.len());
        for raw in ids {
            let Some(conversation) = load_conversation(&tx, ConversationId(raw))? else {
                continue;
            };

            let cursor = conversation.last_read_at.get(user_id).copied().unwrap_or(0);
            let unread_count = count_unread(&tx, conversation.id, user_id, cursor)?;

            let peer = if conversation.is_group {
                None
            } else {
                match conversation.peer_of(user_id) {
                    Some(peer_id) => Some((peer_id.clone(), self.get_user(peer_id)?)),
                    None => None,
                }
            };

            let name = if conversation.is_group {
                conversation.group_label()
            } else {
                peer.as_ref()
                    .and_then(|(_, user)| user.as_ref())
                    .and_then(|u| u.display_name())
                    .unwrap_or("Conversation")
                    .to_string()
            };
            let avatar_url = peer
                .as_ref()
                .and_then(|(_, user)| user.as_ref())
                .and_then(|u| u.avatar_url.clone());

            summaries.push(ConversationSummary {
                id: conversation.id,
                name,
                avatar_url,
                other_member_id: peer.map(|(id, _)| id),
                is_group: conversation.is_group,
                member_count: conversation.members.len(),
                unread_count,
                last_message_text: conversation.last_message.as_ref().map(|m| m.text.clone()),
                last_message_at: conversation.last_activity_at(),
            });
        }
        tx.commit()?;

        summaries.sort_by(|a, b| {
            b.last_message_at
                .cmp(&a.last_message_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(summaries)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Move `user_id`'s read cursor to now.  The cursor never moves
    /// backwards.  Silently does nothing for non-members.
    pub fn mark_read(&self, id: ConversationId, user_id: &UserId) -> Result<()> {
        let now = self.now_ms();
        let affected = self.conn().execute(
            "UPDATE conversation_members
             SET last_read_at = MAX(last_read_at, ?3)
             WHERE conversation_id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.as_str(), now],
        )?;

        if affected == 0 {
            tracing::debug!(conversation_id = %id, user_id = %user_id, "mark_read ignored for non-member");
            return Ok(());
        }

        self.emit(StoreEvent::ConversationUpdated { conversation_id: id });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_direct(conn: &Connection, key: &str) -> Result<Option<ConversationId>> {
    let id = conn
        .query_row(
            "SELECT id FROM conversations WHERE direct_key = ?1",
            params![key],
            |row| col_uuid(row, 0),
        )
        .optional()?;
    Ok(id.map(ConversationId))
}

fn insert_members(conn: &Connection, id: ConversationId, members: &[UserId]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO conversation_members (conversation_id, user_id, last_read_at)
         VALUES (?1, ?2, 0)",
    )?;
    for member in members {
        stmt.execute(params![id.to_string(), member.as_str()])?;
    }
    Ok(())
}

fn count_unread(
    conn: &Connection,
    id: ConversationId,
    user_id: &UserId,
    cursor: i64,
) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM messages
         WHERE conversation_id = ?1 AND created_at > ?2 AND sender_id <> ?3",
        params![id.to_string(), cursor, user_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// Load a conversation together with its members and read cursors.
pub(crate) fn load_conversation(
    conn: &Connection,
    id: ConversationId,
) -> Result<Option<Conversation>> {
    let row = conn
        .query_row(
            "SELECT is_group, members_key, name, created_at,
                    last_message_text, last_message_sender, last_message_at
             FROM conversations WHERE id = ?1",
            params![id.to_string()],
            |row| {
                let last_text: Option<String> = row.get(4)?;
                let last_sender: Option<String> = row.get(5)?;
                let last_at: Option<i64> = row.get(6)?;
                let last_message = match (last_text, last_sender, last_at) {
                    (Some(text), Some(_), Some(created_at)) => Some(LastMessage {
                        text,
                        sender_id: col_user_id(row, 5)?,
                        created_at,
                    }),
                    _ => None,
                };
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    last_message,
                ))
            },
        )
        .optional()?;

    let Some((is_group, members_key, name, created_at, last_message)) = row else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT user_id, last_read_at FROM conversation_members
         WHERE conversation_id = ?1
         ORDER BY user_id ASC",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok((col_user_id(row, 0)?, row.get::<_, i64>(1)?))
    })?;

    let mut members = Vec::new();
    let mut last_read_at = BTreeMap::new();
    for row in rows {
        let (member, cursor) = row?;
        members.push(member.clone());
        last_read_at.insert(member, cursor);
    }
    // SQLite's BINARY collation matches byte order, but keep the invariant
    // independent of it.
    members.sort();

    Ok(Some(Conversation {
        id,
        is_group,
        members,
        members_key,
        name,
        created_at,
        last_message,
        last_read_at,
    }))
}

/// Fail unless `user_id` belongs to conversation `id`.
pub(crate) fn require_member(conn: &Connection, id: ConversationId, user_id: &UserId) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM conversation_members WHERE conversation_id = ?1 AND user_id = ?2",
            params![id.to_string(), user_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::AccessDenied(
            "Conversation not found or access denied".into(),
        )),
    }
}
