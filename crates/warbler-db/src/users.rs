use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use rusqlite::{Connection, Row};
use tracing::debug;

use crate::error::{DbError, OptionalExt, Result};
use crate::messages::MESSAGE_COLUMNS;
use crate::migrations::{DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL};
use crate::models::{MessageRow, NewUser, ProfileUpdate, UserRow, UserStats};

const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password";

impl UserRow {
    /// Hash the password with Argon2id and insert a new user.
    ///
    /// Duplicate usernames or emails surface as [`DbError::Integrity`].
    pub fn signup(conn: &Connection, new: NewUser<'_>) -> Result<UserRow> {
        require("username", new.username)?;
        require("email", new.email)?;
        require("password", new.password)?;

        let password = hash_password(new.password)?;
        let image_url = new
            .image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_IMAGE_URL);

        conn.execute(
            "INSERT INTO users (username, email, password, image_url) VALUES (?1, ?2, ?3, ?4)",
            (new.username, new.email, &password, image_url),
        )?;

        let id = conn.last_insert_rowid();
        debug!("Signed up user {} ({})", new.username, id);

        Ok(UserRow {
            id,
            email: new.email.to_string(),
            username: new.username.to_string(),
            image_url: image_url.to_string(),
            header_image_url: DEFAULT_HEADER_IMAGE_URL.to_string(),
            bio: None,
            location: None,
            password,
        })
    }

    /// Look up `username` and verify `password` against its hash.
    ///
    /// Returns `Ok(None)` for an unknown user or a wrong password.
    pub fn authenticate(conn: &Connection, username: &str, password: &str) -> Result<Option<UserRow>> {
        let Some(user) = Self::by_username(conn, username)? else {
            return Ok(None);
        };

        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|e| DbError::PasswordHash(e.to_string()))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(Some(user)),
            Err(_) => Ok(None),
        }
    }

    pub fn get(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1");
        conn.query_row(&sql, [id], user_from_row).optional()
    }

    pub fn by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1");
        conn.query_row(&sql, [username], user_from_row).optional()
    }

    /// All users, or those whose username contains `query`.
    pub fn search(conn: &Connection, query: Option<&str>) -> Result<Vec<UserRow>> {
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users u
                     WHERE u.username LIKE '%' || ?1 || '%'
                     ORDER BY u.username"
                );
                collect_users(conn, &sql, [q])
            }
            None => {
                let sql = format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.username");
                collect_users(conn, &sql, rusqlite::params![])
            }
        }
    }

    /// Does this user follow `other`?
    pub fn is_following(&self, conn: &Connection, other: &UserRow) -> Result<bool> {
        follow_exists(conn, self.id, other.id)
    }

    /// Is this user followed by `other`?
    pub fn is_followed_by(&self, conn: &Connection, other: &UserRow) -> Result<bool> {
        follow_exists(conn, other.id, self.id)
    }

    /// Users following this user.
    pub fn followers(&self, conn: &Connection) -> Result<Vec<UserRow>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u
             JOIN follows f ON f.user_following_id = u.id
             WHERE f.user_being_followed_id = ?1
             ORDER BY u.username"
        );
        collect_users(conn, &sql, [self.id])
    }

    /// Users this user follows.
    pub fn following(&self, conn: &Connection) -> Result<Vec<UserRow>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u
             JOIN follows f ON f.user_being_followed_id = u.id
             WHERE f.user_following_id = ?1
             ORDER BY u.username"
        );
        collect_users(conn, &sql, [self.id])
    }

    /// Messages written by this user, newest first.
    pub fn messages(&self, conn: &Connection) -> Result<Vec<MessageRow>> {
        MessageRow::by_user(conn, self.id)
    }

    /// Messages this user has liked, newest first.
    pub fn likes(&self, conn: &Connection) -> Result<Vec<MessageRow>> {
        let sql = format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON m.user_id = u.id
             JOIN likes l ON l.message_id = m.id
             WHERE l.user_id = ?1
             ORDER BY m.timestamp DESC, m.id DESC"
        );
        MessageRow::collect(conn, &sql, [self.id])
    }

    pub fn stats(&self, conn: &Connection) -> Result<UserStats> {
        Ok(conn.query_row(
            "SELECT
                 (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                 (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                 (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                 (SELECT COUNT(*) FROM likes WHERE user_id = ?1)",
            [self.id],
            |row| {
                Ok(UserStats {
                    messages: row.get(0)?,
                    following: row.get(1)?,
                    followers: row.get(2)?,
                    likes: row.get(3)?,
                })
            },
        )?)
    }

    pub fn update_profile(&mut self, conn: &Connection, update: &ProfileUpdate) -> Result<()> {
        require("username", &update.username)?;
        require("email", &update.email)?;

        let image_url = non_blank(update.image_url.as_deref()).unwrap_or(DEFAULT_IMAGE_URL);
        let header_image_url =
            non_blank(update.header_image_url.as_deref()).unwrap_or(DEFAULT_HEADER_IMAGE_URL);
        let bio = non_blank(update.bio.as_deref());
        let location = non_blank(update.location.as_deref());

        conn.execute(
            "UPDATE users
             SET username = ?1, email = ?2, image_url = ?3, header_image_url = ?4,
                 bio = ?5, location = ?6
             WHERE id = ?7",
            rusqlite::params![
                update.username,
                update.email,
                image_url,
                header_image_url,
                bio,
                location,
                self.id
            ],
        )?;

        self.username = update.username.clone();
        self.email = update.email.clone();
        self.image_url = image_url.to_string();
        self.header_image_url = header_image_url.to_string();
        self.bio = bio.map(str::to_string);
        self.location = location.map(str::to_string);
        Ok(())
    }

    /// Delete a user. Their messages, follows and likes cascade.
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let removed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    pub fn count(conn: &Connection) -> Result<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::PasswordHash(e.to_string()))
}

fn require(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DbError::MissingField(field));
    }
    Ok(())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn follow_exists(conn: &Connection, follower_id: i64, followed_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(
             SELECT 1 FROM follows
             WHERE user_following_id = ?1 AND user_being_followed_id = ?2
         )",
        [follower_id, followed_id],
        |row| row.get(0),
    )?)
}

fn collect_users<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        image_url: row.get(3)?,
        header_image_url: row.get(4)?,
        bio: row.get(5)?,
        location: row.get(6)?,
        password: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FollowRow, LikeRow};
    use crate::test_support::{connection, two_users};

    #[test]
    fn new_user_has_no_messages_or_followers() {
        let mut conn = connection();
        let tx = conn.transaction().unwrap();
        let (u1, _) = two_users(&tx);

        let u1 = UserRow::get(&tx, u1.id).unwrap().unwrap();
        assert!(u1.messages(&tx).unwrap().is_empty());
        assert!(u1.followers(&tx).unwrap().is_empty());
        assert!(u1.likes(&tx).unwrap().is_empty());
    }

    #[test]
    fn is_following_and_is_followed_by() {
        let conn = connection();
        let (u1, u2) = two_users(&conn);

        assert!(!u1.is_following(&conn, &u2).unwrap());
        assert!(!u2.is_followed_by(&conn, &u1).unwrap());

        FollowRow::create(&conn, u1.id, u2.id).unwrap();

        assert!(u1.is_following(&conn, &u2).unwrap());
        assert!(u2.is_followed_by(&conn, &u1).unwrap());
        // the edge is directed
        assert!(!u2.is_following(&conn, &u1).unwrap());
        assert!(!u1.is_followed_by(&conn, &u2).unwrap());

        assert_eq!(u2.followers(&conn).unwrap(), vec![u1.clone()]);
        assert_eq!(u1.following(&conn).unwrap(), vec![u2.clone()]);
        assert!(u1.followers(&conn).unwrap().is_empty());
    }

    #[test]
    fn signup_hashes_password() {
        let conn = connection();
        let u3 = UserRow::signup(&conn, NewUser::new("u3", "u3@email.com", "password")).unwrap();

        assert_eq!(u3.username, "u3");
        assert_eq!(u3.email, "u3@email.com");
        assert_eq!(u3.image_url, DEFAULT_IMAGE_URL);
        assert_ne!(u3.password, "password");
        assert!(u3.password.starts_with("$argon2id$"), "{}", u3.password);

        let stored = UserRow::get(&conn, u3.id).unwrap().unwrap();
        assert_eq!(stored, u3);
    }

    #[test]
    fn signup_keeps_custom_image() {
        let conn = connection();
        let user = UserRow::signup(
            &conn,
            NewUser::new("u3", "u3@email.com", "password").with_image_url("/me.png"),
        )
        .unwrap();
        assert_eq!(user.image_url, "/me.png");
    }

    #[test]
    fn signup_rejects_duplicates_and_missing_fields() {
        let conn = connection();
        two_users(&conn);

        let dup_email = UserRow::signup(&conn, NewUser::new("u3", "u1@email.com", "password"));
        assert!(dup_email.unwrap_err().is_integrity());

        let dup_username = UserRow::signup(&conn, NewUser::new("u1", "u4@email.com", "password"));
        assert!(dup_username.unwrap_err().is_integrity());

        let missing = UserRow::signup(&conn, NewUser::new("u5", "", ""));
        assert!(matches!(missing, Err(DbError::MissingField("email"))));

        // failed statements leave the connection usable
        assert_eq!(UserRow::count(&conn).unwrap(), 2);
        UserRow::signup(&conn, NewUser::new("u6", "u6@email.com", "password")).unwrap();
    }

    #[test]
    fn authenticate_returns_matching_user() {
        let conn = connection();
        let (u1, _) = two_users(&conn);

        let authed = UserRow::authenticate(&conn, "u1", "password").unwrap().unwrap();
        assert_eq!(authed.id, u1.id);
        assert_eq!(authed.password, u1.password);
        assert_eq!(authed.email, u1.email);
    }

    #[test]
    fn authenticate_rejects_bad_credentials() {
        let conn = connection();
        two_users(&conn);

        assert!(UserRow::authenticate(&conn, "safdsafds", "password").unwrap().is_none());
        assert!(UserRow::authenticate(&conn, "u1", "password1").unwrap().is_none());
    }

    #[test]
    fn user_messages_and_likes() {
        let conn = connection();
        let (u1, u2) = two_users(&conn);

        let message = MessageRow::create(&conn, u2.id, "Cool!").unwrap();
        MessageRow::create(&conn, u1.id, "Mine").unwrap();
        LikeRow::create(&conn, u1.id, message.id).unwrap();

        assert_eq!(u1.messages(&conn).unwrap().len(), 1);
        let likes = u1.likes(&conn).unwrap();
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].id, message.id);
        assert_eq!(likes[0].author_username, "u2");

        let stats = u1.stats(&conn).unwrap();
        assert_eq!(
            stats,
            UserStats {
                messages: 1,
                following: 0,
                followers: 0,
                likes: 1,
            }
        );
    }

    #[test]
    fn search_matches_substrings() {
        let conn = connection();
        two_users(&conn);
        UserRow::signup(&conn, NewUser::new("alice", "alice@email.com", "password")).unwrap();

        assert_eq!(UserRow::search(&conn, None).unwrap().len(), 3);
        assert_eq!(UserRow::search(&conn, Some("  ")).unwrap().len(), 3);

        let found = UserRow::search(&conn, Some("u")).unwrap();
        let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["u1", "u2"]);
    }

    #[test]
    fn update_profile_persists_and_checks_uniqueness() {
        let conn = connection();
        let (mut u1, _) = two_users(&conn);

        let update = ProfileUpdate {
            username: "u1-renamed".into(),
            email: "u1@email.com".into(),
            bio: Some("hi there".into()),
            ..Default::default()
        };
        u1.update_profile(&conn, &update).unwrap();

        let stored = UserRow::get(&conn, u1.id).unwrap().unwrap();
        assert_eq!(stored.username, "u1-renamed");
        assert_eq!(stored.bio.as_deref(), Some("hi there"));
        assert_eq!(stored.image_url, DEFAULT_IMAGE_URL);

        let clash = ProfileUpdate {
            username: "u2".into(),
            email: "u1@email.com".into(),
            ..Default::default()
        };
        assert!(u1.update_profile(&conn, &clash).unwrap_err().is_integrity());
    }

    #[test]
    fn delete_cascades() {
        let conn = connection();
        let (u1, u2) = two_users(&conn);
        let message = MessageRow::create(&conn, u1.id, "bye").unwrap();
        FollowRow::create(&conn, u2.id, u1.id).unwrap();
        LikeRow::create(&conn, u2.id, message.id).unwrap();

        assert!(UserRow::delete(&conn, u1.id).unwrap());
        assert!(!UserRow::delete(&conn, u1.id).unwrap());

        assert!(MessageRow::get(&conn, message.id).unwrap().is_none());
        assert!(u2.following(&conn).unwrap().is_empty());
        assert!(u2.likes(&conn).unwrap().is_empty());
    }
}
