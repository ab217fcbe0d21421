//! Idempotent demo fixtures: three demo users and a seeded direct
//! conversation with the current user.

use hearth_shared::types::{ConversationId, UserId};
use rusqlite::{params, TransactionBehavior};
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;
use crate::events::StoreEvent;
use crate::messages::{insert_message, patch_last_message};
use crate::models::UserProfileInput;

struct DemoUser {
    user_id: &'static str,
    name: &'static str,
    handle: &'static str,
}

const DEMO_USERS: [DemoUser; 3] = [
    DemoUser {
        user_id: "demo_alex",
        name: "Alex Tars",
        handle: "alex",
    },
    DemoUser {
        user_id: "demo_ria",
        name: "Ria Product",
        handle: "ria",
    },
    DemoUser {
        user_id: "demo_noah",
        name: "Noah Design",
        handle: "noah",
    },
];

const MINUTE_MS: i64 = 60 * 1000;

/// (sender is the demo peer, minutes ago, text)
const DEMO_MESSAGES: [(bool, i64, &str); 3] = [
    (true, 20, "Hey, this is seeded demo data so you can showcase the app."),
    (false, 17, "Perfect, I'll use this for the demo."),
    (true, 14, "Show unread badges, timestamps, and realtime updates."),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded_users: usize,
    pub conversation_id: ConversationId,
    /// False when the conversation already had history.
    pub seeded_messages: bool,
}

impl Database {
    /// Load the demo fixtures for `current_user_id`.  Existing profiles and
    /// conversation history are left untouched, so repeat calls are no-ops.
    pub fn seed_demo_data(
        &mut self,
        current_user_id: &UserId,
        current_name: Option<&str>,
    ) -> Result<SeedReport> {
        let now = self.now_ms();

        if self.get_user(current_user_id)?.is_none() {
            self.upsert_user(&UserProfileInput {
                user_id: current_user_id.to_string(),
                name: Some(current_name.unwrap_or("You").to_string()),
                ..Default::default()
            })?;
        }

        for demo in &DEMO_USERS {
            let id = UserId::parse(demo.user_id)?;
            if self.get_user(&id)?.is_none() {
                self.upsert_user(&UserProfileInput {
                    user_id: demo.user_id.to_string(),
                    name: Some(demo.name.to_string()),
                    handle: Some(demo.handle.to_string()),
                    avatar_url: None,
                })?;
            }
        }

        let peer = UserId::parse(DEMO_USERS[0].user_id)?;
        let conversation_id = self.find_or_create_direct(current_user_id, &peer)?;

        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
            params![conversation_id.to_string()],
            |row| row.get(0),
        )?;

        let seeded_messages = existing == 0;
        if seeded_messages {
            let mut last = None;
            for (from_peer, minutes_ago, text) in DEMO_MESSAGES {
                let sender = if from_peer { &peer } else { current_user_id };
                let created_at = now - minutes_ago * MINUTE_MS;
                insert_message(&tx, conversation_id, sender, text, created_at)?;
                last = Some((sender, text, created_at));
            }
            if let Some((sender, text, created_at)) = last {
                patch_last_message(&tx, conversation_id, sender, text, created_at)?;
            }
        }
        tx.commit()?;

        if seeded_messages {
            tracing::info!(conversation_id = %conversation_id, "demo conversation seeded");
            self.emit(StoreEvent::ConversationUpdated { conversation_id });
        }

        Ok(SeedReport {
            seeded_users: DEMO_USERS.len(),
            conversation_id,
            seeded_messages,
        })
    }
}
