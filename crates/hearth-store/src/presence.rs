//! Presence tracker: one online flag per user, last writer wins.

use hearth_shared::types::UserId;
use rusqlite::{params, OptionalExtension};

use crate::database::{col_user_id, Database};
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::PresenceRecord;

impl Database {
    pub fn set_online(&self, user_id: &UserId, online: bool) -> Result<()> {
        let now = self.now_ms();
        self.conn().execute(
            "INSERT INTO presence (user_id, online, last_seen_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 online = excluded.online,
                 last_seen_at = excluded.last_seen_at",
            params![user_id.as_str(), online, now],
        )?;

        tracing::debug!(user_id = %user_id, online, "presence updated");
        self.emit(StoreEvent::PresenceChanged {
            user_id: user_id.clone(),
        });
        Ok(())
    }

    pub fn get_presence(&self, user_id: &UserId) -> Result<Option<PresenceRecord>> {
        let record = self
            .conn()
            .query_row(
                "SELECT user_id, online, last_seen_at FROM presence WHERE user_id = ?1",
                params![user_id.as_str()],
                row_to_presence,
            )
            .optional()?;
        Ok(record)
    }

    /// Records for the requested users.  Users without a record are omitted.
    pub fn list_presence(&self, user_ids: &[UserId]) -> Result<Vec<PresenceRecord>> {
        let mut ids: Vec<&UserId> = user_ids.iter().collect();
        ids.sort();
        ids.dedup();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get_presence(id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn row_to_presence(row: &rusqlite::Row<'_>) -> rusqlite::Result<PresenceRecord> {
    Ok(PresenceRecord {
        user_id: col_user_id(row, 0)?,
        online: row.get(1)?,
        last_seen_at: row.get(2)?,
    })
}
