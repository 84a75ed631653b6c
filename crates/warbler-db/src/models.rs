//! Database row types, mapped directly from SQLite rows.
//! Distinct from warbler-types display models so pages never see password hashes.
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use warbler_types::models::{Message, User};

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

/// Input to [`UserRow::signup`]. `password` is plaintext and gets hashed.
#[derive(Debug, Clone, Copy)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub image_url: Option<&'a str>,
}

impl<'a> NewUser<'a> {
    pub fn new(username: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            username,
            email,
            password,
            image_url: None,
        }
    }

    pub fn with_image_url(mut self, image_url: &'a str) -> Self {
        self.image_url = Some(image_url);
        self
    }
}

/// Editable profile fields. `None` for an image keeps the default.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

/// Counters shown in a profile header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserStats {
    pub messages: i64,
    pub following: i64,
    pub followers: i64,
    pub likes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
    pub user_id: i64,
    pub author_username: String,
    pub author_image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowRow {
    pub user_being_followed_id: i64,
    pub user_following_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeRow {
    pub user_id: i64,
    pub message_id: i64,
}

impl From<&UserRow> for User {
    fn from(row: &UserRow) -> Self {
        User {
            id: row.id,
            username: row.username.clone(),
            email: row.email.clone(),
            image_url: row.image_url.clone(),
            header_image_url: row.header_image_url.clone(),
            bio: row.bio.clone(),
            location: row.location.clone(),
        }
    }
}

impl From<&MessageRow> for Message {
    fn from(row: &MessageRow) -> Self {
        Message {
            id: row.id,
            text: row.text.clone(),
            timestamp: parse_timestamp(&row.timestamp).unwrap_or_else(|| {
                warn!("Corrupt timestamp '{}' on message {}", row.timestamp, row.id);
                DateTime::default()
            }),
            user_id: row.user_id,
            author_username: row.author_username.clone(),
            author_image_url: row.author_image_url.clone(),
        }
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS[.SSS]" without timezone.
/// Parse as naive UTC and convert.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2024-03-05 12:34:56.789").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (12, 34, 56));

        assert!(parse_timestamp("2024-03-05 12:34:56").is_some());
        assert!(parse_timestamp("2024-03-05T12:34:56Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn display_user_drops_password() {
        let row = UserRow {
            id: 1,
            email: "u1@email.com".into(),
            username: "u1".into(),
            image_url: "/a.png".into(),
            header_image_url: "/b.png".into(),
            bio: None,
            location: Some("Oakland".into()),
            password: "$argon2id$...".into(),
        };
        let user = User::from(&row);
        assert_eq!(user.username, "u1");
        assert_eq!(user.location.as_deref(), Some("Oakland"));
    }
}
