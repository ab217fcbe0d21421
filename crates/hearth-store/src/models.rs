//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the API
//! layer.  Timestamps are Unix milliseconds as read from the store's
//! [`Clock`](crate::Clock).

use std::collections::{BTreeMap, BTreeSet};

use hearth_shared::reaction;
use hearth_shared::types::{ConversationId, MessageId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Local copy of a profile supplied by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub name: Option<String>,
    /// Handle / username.
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}

impl User {
    /// Name, falling back to the handle.
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.handle.as_deref().filter(|h| !h.is_empty()))
    }
}

/// Profile fields pushed by the identity collaborator on sign-in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfileInput {
    pub user_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Denormalized summary of the newest message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LastMessage {
    pub text: String,
    pub sender_id: UserId,
    pub created_at: i64,
}

/// A direct or group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    pub id: ConversationId,
    pub is_group: bool,
    /// Canonically sorted, duplicate-free.
    pub members: Vec<UserId>,
    pub members_key: String,
    pub name: Option<String>,
    pub created_at: i64,
    pub last_message: Option<LastMessage>,
    /// Read cursor per member, 0 until the member first reads.
    pub last_read_at: BTreeMap<UserId, i64>,
}

impl Conversation {
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.binary_search(user_id).is_ok()
    }

    /// First member that is not `user_id`.
    pub fn peer_of(&self, user_id: &UserId) -> Option<&UserId> {
        self.members.iter().find(|m| *m != user_id)
    }

    pub fn group_label(&self) -> String {
        match self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => format!("Group ({})", self.members.len()),
        }
    }

    /// Newest activity: last message time, else creation time.
    pub fn last_activity_at(&self) -> i64 {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.created_at)
    }
}

/// Conversation as shown in a chat header.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub title: String,
    pub subtitle: String,
}

/// One row of a user's conversation list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Direct conversations only.
    pub other_member_id: Option<UserId>,
    pub is_group: bool,
    pub member_count: usize,
    pub unread_count: u64,
    pub last_message_text: Option<String>,
    pub last_message_at: i64,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Deleted messages stay as tombstones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    /// Position within the conversation, strictly increasing.
    pub seq: i64,
    pub sender_id: UserId,
    /// Empty once deleted.
    pub text: String,
    pub created_at: i64,
    pub edited_at: Option<i64>,
    pub deleted: bool,
    /// Encoded reaction key -> users who applied it.
    pub reactions: BTreeMap<String, BTreeSet<UserId>>,
}

impl Message {
    /// Reactions keyed by the emoji itself, for display.
    pub fn decoded_reactions(&self) -> Result<BTreeMap<String, BTreeSet<UserId>>> {
        let mut out: BTreeMap<String, BTreeSet<UserId>> = BTreeMap::new();
        for (key, users) in &self.reactions {
            out.entry(reaction::decode(key)?)
                .or_default()
                .extend(users.iter().cloned());
        }
        Ok(out)
    }

    pub fn has_reaction(&self, user_id: &UserId, emoji: &str) -> bool {
        self.reactions
            .get(&reaction::encode(emoji))
            .is_some_and(|users| users.contains(user_id))
    }
}

// ---------------------------------------------------------------------------
// Presence & typing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceRecord {
    pub user_id: UserId,
    pub online: bool,
    pub last_seen_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypingRecord {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    /// Display name captured when the record was written.
    pub user_name: String,
    pub last_typing_at: i64,
}

impl TypingRecord {
    pub fn is_expired(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms - self.last_typing_at > window_ms
    }
}
