use rusqlite::{Connection, Row};

use warbler_types::api::MESSAGE_MAX_LEN;

use crate::error::{DbError, OptionalExt, Result};
use crate::models::{MessageRow, UserRow};

/// Columns read by every message query. Expects `messages m JOIN users u`.
pub(crate) const MESSAGE_COLUMNS: &str =
    "m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url";

impl MessageRow {
    /// Insert a message for `user_id`.
    ///
    /// An unknown user is an integrity error; text over 140 characters is a
    /// data error, checked here and again by the column's CHECK constraint.
    pub fn create(conn: &Connection, user_id: i64, text: &str) -> Result<MessageRow> {
        check_text(text)?;

        conn.execute(
            "INSERT INTO messages (user_id, text) VALUES (?1, ?2)",
            rusqlite::params![user_id, text],
        )?;

        let id = conn.last_insert_rowid();
        Self::get(conn, id)?.ok_or_else(|| DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
        // JOIN users to fetch the author in a single query
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON m.user_id = u.id
             WHERE m.id = ?1"
        );
        conn.query_row(&sql, [id], message_from_row).optional()
    }

    /// The author of this message.
    pub fn user(&self, conn: &Connection) -> Result<UserRow> {
        UserRow::get(conn, self.user_id)?
            .ok_or_else(|| DbError::Integrity(format!("message {} has no author", self.id)))
    }

    /// Persist an edited `text`.
    pub fn save(&self, conn: &Connection) -> Result<()> {
        check_text(&self.text)?;
        conn.execute(
            "UPDATE messages SET text = ?1 WHERE id = ?2",
            rusqlite::params![self.text, self.id],
        )?;
        Ok(())
    }

    /// Returns whether a row was removed.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let removed = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?)
    }

    pub fn find_by_text(conn: &Connection, text: &str) -> Result<Vec<MessageRow>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON m.user_id = u.id
             WHERE m.text = ?1
             ORDER BY m.id"
        );
        Self::collect(conn, &sql, [text])
    }

    pub fn by_user(conn: &Connection, user_id: i64) -> Result<Vec<MessageRow>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON m.user_id = u.id
             WHERE m.user_id = ?1
             ORDER BY m.timestamp DESC, m.id DESC"
        );
        Self::collect(conn, &sql, [user_id])
    }

    /// Messages by `user_id` and everyone they follow, newest first.
    pub fn timeline(conn: &Connection, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON m.user_id = u.id
             WHERE m.user_id = ?1
                OR m.user_id IN (
                    SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                )
             ORDER BY m.timestamp DESC, m.id DESC
             LIMIT ?2"
        );
        Self::collect(conn, &sql, rusqlite::params![user_id, limit])
    }

    pub(crate) fn collect<P: rusqlite::Params>(
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, message_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Blank text is a missing field; over-long text is a data error.
fn check_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(DbError::MissingField("text"));
    }
    if text.chars().count() > MESSAGE_MAX_LEN {
        return Err(DbError::Data(format!(
            "message text exceeds {} characters",
            MESSAGE_MAX_LEN
        )));
    }
    Ok(())
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FollowRow;
    use crate::test_support::{connection, two_users};

    /// Two users with one message each, like a fresh homepage.
    fn seeded(conn: &Connection) -> (UserRow, UserRow, MessageRow, MessageRow) {
        let (u1, u2) = two_users(conn);
        let m1 = MessageRow::create(conn, u1.id, "Message 1 by user 1!").unwrap();
        let m2 = MessageRow::create(conn, u2.id, "Message 2 by user 2!").unwrap();
        (u1, u2, m1, m2)
    }

    #[test]
    fn message_belongs_to_user() {
        let conn = connection();
        let (u1, _, m1, _) = seeded(&conn);

        let m1 = MessageRow::get(&conn, m1.id).unwrap().unwrap();
        assert_eq!(m1.user(&conn).unwrap(), u1);
        assert_eq!(m1.author_username, "u1");
    }

    #[test]
    fn create_message_valid() {
        let conn = connection();
        let (u1, _, _, _) = seeded(&conn);

        let m3 = MessageRow::create(&conn, u1.id, "Another message!").unwrap();

        assert_eq!(MessageRow::count(&conn).unwrap(), 3);
        assert_eq!(m3.text, "Another message!");
        assert_eq!(m3.user(&conn).unwrap().id, u1.id);
    }

    #[test]
    fn create_message_invalid() {
        let conn = connection();
        let (u1, _, _, _) = seeded(&conn);

        let no_user = MessageRow::create(&conn, 9999, "orphan");
        assert!(no_user.unwrap_err().is_integrity());

        let no_text = MessageRow::create(&conn, u1.id, "");
        assert!(matches!(no_text, Err(DbError::MissingField("text"))));

        let too_long = MessageRow::create(&conn, u1.id, &"x".repeat(141));
        assert!(too_long.unwrap_err().is_data());

        // exactly at the limit is fine, counted in characters not bytes
        MessageRow::create(&conn, u1.id, &"é".repeat(140)).unwrap();
        assert_eq!(MessageRow::count(&conn).unwrap(), 3);
    }

    #[test]
    fn delete_message() {
        let conn = connection();
        let (_, _, m1, m2) = seeded(&conn);

        assert!(MessageRow::delete(&conn, m1.id).unwrap());
        assert_eq!(MessageRow::count(&conn).unwrap(), 1);
        assert!(MessageRow::get(&conn, m1.id).unwrap().is_none());
        assert!(MessageRow::get(&conn, m2.id).unwrap().is_some());

        assert!(!MessageRow::delete(&conn, m1.id).unwrap());
    }

    #[test]
    fn edit_message() {
        let conn = connection();
        let (_, _, mut m1, _) = seeded(&conn);

        m1.text = "Edited!".to_string();
        m1.save(&conn).unwrap();

        let reloaded = MessageRow::get(&conn, m1.id).unwrap().unwrap();
        assert_eq!(reloaded.text, "Edited!");
    }

    #[test]
    fn edit_message_invalid() {
        let conn = connection();
        let (_, _, mut m1, _) = seeded(&conn);

        m1.text = "y".repeat(200);
        assert!(m1.save(&conn).unwrap_err().is_data());

        m1.text = " ".to_string();
        assert!(matches!(m1.save(&conn), Err(DbError::MissingField("text"))));

        let reloaded = MessageRow::get(&conn, m1.id).unwrap().unwrap();
        assert_eq!(reloaded.text, "Message 1 by user 1!");
    }

    #[test]
    fn nul_does_not_hide_length() {
        let conn = connection();
        let (_, _, mut m1, _) = seeded(&conn);
        let padded = format!("a\0{}", "x".repeat(300));

        assert!(MessageRow::create(&conn, m1.user_id, &padded).unwrap_err().is_data());

        m1.text = padded;
        assert!(m1.save(&conn).unwrap_err().is_data());

        assert_eq!(MessageRow::count(&conn).unwrap(), 2);
        let reloaded = MessageRow::get(&conn, m1.id).unwrap().unwrap();
        assert_eq!(reloaded.text, "Message 1 by user 1!");
    }

    #[test]
    fn schema_rejects_nul_in_text() {
        let conn = connection();
        let (u1, _, _, _) = seeded(&conn);

        let err: DbError = conn
            .execute(
                "INSERT INTO messages (user_id, text) VALUES (?1, ?2)",
                rusqlite::params![u1.id, format!("a\0{}", "x".repeat(300))],
            )
            .unwrap_err()
            .into();
        assert!(err.is_data(), "{err}");
    }

    #[test]
    fn find_by_text_matches_exactly() {
        let conn = connection();
        let (u1, _, _, _) = seeded(&conn);
        MessageRow::create(&conn, u1.id, "Hello").unwrap();

        assert_eq!(MessageRow::find_by_text(&conn, "Hello").unwrap().len(), 1);
        assert!(MessageRow::find_by_text(&conn, "Hell").unwrap().is_empty());
    }

    #[test]
    fn timeline_includes_followed_users() {
        let conn = connection();
        let (u1, u2, m1, m2) = seeded(&conn);

        let own: Vec<_> = MessageRow::timeline(&conn, u1.id, 100)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(own, vec![m1.id]);

        FollowRow::create(&conn, u1.id, u2.id).unwrap();
        let m3 = MessageRow::create(&conn, u1.id, "newest").unwrap();

        let ids: Vec<_> = MessageRow::timeline(&conn, u1.id, 100)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![m3.id, m2.id, m1.id]);

        assert_eq!(MessageRow::timeline(&conn, u1.id, 2).unwrap().len(), 2);
        // following is one-way
        assert_eq!(MessageRow::timeline(&conn, u2.id, 100).unwrap().len(), 1);
    }
}
