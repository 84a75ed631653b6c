use rusqlite::Connection;

use crate::error::Result;
use crate::models::FollowRow;

impl FollowRow {
    /// Record that `follower_id` follows `followed_id`.
    ///
    /// Following twice is an integrity error.
    pub fn create(conn: &Connection, follower_id: i64, followed_id: i64) -> Result<FollowRow> {
        conn.execute(
            "INSERT INTO follows (user_following_id, user_being_followed_id) VALUES (?1, ?2)",
            [follower_id, followed_id],
        )?;
        Ok(FollowRow {
            user_being_followed_id: followed_id,
            user_following_id: follower_id,
        })
    }

    pub fn delete(conn: &Connection, follower_id: i64, followed_id: i64) -> Result<bool> {
        let removed = conn.execute(
            "DELETE FROM follows WHERE user_following_id = ?1 AND user_being_followed_id = ?2",
            [follower_id, followed_id],
        )?;
        Ok(removed > 0)
    }
}
