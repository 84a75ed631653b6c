pub mod error;
pub mod follows;
pub mod likes;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod users;

use std::sync::Mutex;
use tracing::info;

pub use error::{DbError, Result};
pub use rusqlite::{Connection, Transaction};
pub use models::{FollowRow, LikeRow, MessageRow, NewUser, ProfileUpdate, UserRow, UserStats};

/// Value of `DATABASE_URL` that selects a private in-memory database.
pub const MEMORY_URL: &str = ":memory:";

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database named by `url` (a file path or `:memory:`) and
    /// create any missing tables.
    pub fn open(url: &str) -> Result<Self> {
        let conn = if url == MEMORY_URL {
            Connection::open_in_memory()?
        } else {
            let conn = Connection::open(url)?;
            // WAL mode for concurrent reads
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn
        };
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::create_all(&conn)?;

        info!("Database opened at {}", url);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(MEMORY_URL)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        f(&conn)
    }

    /// Run `f` inside a transaction. Commits when `f` returns `Ok`,
    /// rolls back otherwise.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| DbError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Drop and recreate every table.
    pub fn reset(&self) -> Result<()> {
        self.with_conn(|conn| {
            migrations::drop_all(conn)?;
            migrations::create_all(conn)
        })?;
        info!("Database schema reset");
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: Result<()> = db.transaction(|tx| {
            UserRow::signup(tx, NewUser::new("u1", "u1@email.com", "password"))?;
            // duplicate email aborts the whole unit of work
            UserRow::signup(tx, NewUser::new("u2", "u1@email.com", "password"))?;
            Ok(())
        });
        assert!(result.unwrap_err().is_integrity());

        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_commits_on_success() {
        let db = Database::open_in_memory().unwrap();

        let user = db
            .transaction(|tx| UserRow::signup(tx, NewUser::new("u1", "u1@email.com", "password")))
            .unwrap();

        let found = db.with_conn(|conn| UserRow::get(conn, user.id)).unwrap();
        assert_eq!(found.unwrap().username, "u1");
    }

    #[test]
    fn reset_clears_data() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| UserRow::signup(conn, NewUser::new("u1", "u1@email.com", "password")))
            .unwrap();

        db.reset().unwrap();

        let found = db.with_conn(|conn| UserRow::by_username(conn, "u1")).unwrap();
        assert!(found.is_none());
    }
}
