//! # hearth-store
//!
//! Conversation and messaging store for the Hearth chat backend, backed by
//! SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides one typed method per operation:
//! conversations, messages, reactions, presence, typing, the identity cache
//! and the demo seeder.  Every successful write publishes a [`StoreEvent`].

pub mod clock;
pub mod conversations;
pub mod database;
pub mod demo;
pub mod events;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod presence;
pub mod reactions;
pub mod typing;
pub mod users;

mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use database::Database;
pub use demo::SeedReport;
pub use error::{Result, StoreError};
pub use events::{EventBus, StoreEvent};
pub use models::*;
