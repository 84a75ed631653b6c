use std::collections::HashSet;

use rusqlite::Connection;

use crate::error::{OptionalExt, Result};
use crate::models::LikeRow;

impl LikeRow {
    pub fn create(conn: &Connection, user_id: i64, message_id: i64) -> Result<LikeRow> {
        conn.execute(
            "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
            [user_id, message_id],
        )?;
        Ok(LikeRow { user_id, message_id })
    }

    /// Toggle a like: removes if it exists, inserts if not.
    /// Returns `true` when the like was added.
    pub fn toggle(conn: &Connection, user_id: i64, message_id: i64) -> Result<bool> {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            Ok(false)
        } else {
            Self::create(conn, user_id, message_id)?;
            Ok(true)
        }
    }

    /// Ids of every message `user_id` has liked.
    pub fn liked_message_ids(conn: &Connection, user_id: i64) -> Result<HashSet<i64>> {
        let mut stmt = conn.prepare("SELECT message_id FROM likes WHERE user_id = ?1")?;
        let ids = stmt
            .query_map([user_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }
}
