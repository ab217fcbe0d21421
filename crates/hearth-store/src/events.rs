//! Change notifications emitted after every successful write.
//!
//! Delivery to live clients (push channel, socket, polling) belongs to
//! whoever holds a receiver; the store only publishes.

use hearth_shared::types::{ConversationId, MessageId, UserId};
use serde::Serialize;
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    UserUpdated {
        user_id: UserId,
    },
    ConversationCreated {
        conversation_id: ConversationId,
    },
    /// Summary, read cursors or membership-visible fields changed.
    ConversationUpdated {
        conversation_id: ConversationId,
    },
    MessageCreated {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// Deleted or reactions changed.
    MessageUpdated {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    PresenceChanged {
        user_id: UserId,
    },
    TypingChanged {
        conversation_id: ConversationId,
        user_id: UserId,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        // No receivers is the common case outside the server.
        if self.tx.send(event).is_err() {
            tracing::trace!("store event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
