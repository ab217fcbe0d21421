//! Identity directory: the local cache of identity-provider profiles.

use std::collections::BTreeSet;

use hearth_shared::types::UserId;
use rusqlite::{params, OptionalExtension};

use crate::database::{col_user_id, Database};
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::{User, UserProfileInput};

const USER_COLUMNS: &str = "user_id, name, handle, avatar_url, created_at";

impl Database {
    /// Insert the profile on first sight, otherwise overwrite the synced
    /// fields.  `created_at` is kept from the first insert.
    pub fn upsert_user(&self, input: &UserProfileInput) -> Result<UserId> {
        let user_id = UserId::parse(&input.user_id)?;
        let now = self.now_ms();

        self.conn().execute(
            "INSERT INTO users (user_id, name, handle, avatar_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                 name = excluded.name,
                 handle = excluded.handle,
                 avatar_url = excluded.avatar_url",
            params![
                user_id.as_str(),
                input.name,
                input.handle,
                input.avatar_url,
                now,
            ],
        )?;

        tracing::debug!(user_id = %user_id, "user profile synced");
        self.emit(StoreEvent::UserUpdated {
            user_id: user_id.clone(),
        });
        Ok(user_id)
    }

    pub fn get_user(&self, user_id: &UserId) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id.as_str()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Fetch several profiles at once.  Duplicates are collapsed and unknown
    /// ids are left out.
    pub fn get_users(&self, user_ids: &[UserId]) -> Result<Vec<User>> {
        let unique: BTreeSet<&UserId> = user_ids.iter().collect();
        let mut users = Vec::with_capacity(unique.len());
        for id in unique {
            if let Some(user) = self.get_user(id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// Case-insensitive substring search over name and handle, excluding
    /// `exclude` (normally the caller), ordered by name.
    pub fn list_users(&self, search: &str, exclude: Option<&UserId>) -> Result<Vec<User>> {
        let term = search.trim().to_lowercase();

        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users"))?;
        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            let user = row?;
            if exclude.is_some_and(|ex| *ex == user.user_id) {
                continue;
            }
            if !term.is_empty() && !matches_term(&user, &term) {
                continue;
            }
            users.push(user);
        }

        users.sort_by(|a, b| {
            let an = a.name.as_deref().unwrap_or("");
            let bn = b.name.as_deref().unwrap_or("");
            an.cmp(bn).then_with(|| a.user_id.cmp(&b.user_id))
        });
        Ok(users)
    }

    /// Name to show for `user_id`, if the profile has one.
    pub(crate) fn display_name_of(&self, user_id: &UserId) -> Result<Option<String>> {
        Ok(self
            .get_user(user_id)?
            .and_then(|u| u.display_name().map(str::to_string)))
    }
}

fn matches_term(user: &User, term: &str) -> bool {
    [user.name.as_deref(), user.handle.as_deref()]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(term))
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        user_id: col_user_id(row, 0)?,
        name: row.get(1)?,
        handle: row.get(2)?,
        avatar_url: row.get(3)?,
        created_at: row.get(4)?,
    })
}
