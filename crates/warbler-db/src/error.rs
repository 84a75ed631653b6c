use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// UNIQUE, NOT NULL, FOREIGN KEY or PRIMARY KEY violation.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Value rejected by a CHECK constraint (e.g. message text too long).
    #[error("data error: {0}")]
    Data(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Sqlite(#[source] rusqlite::Error),
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, msg)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                let detail = msg.clone().unwrap_or_else(|| failure.to_string());
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_CHECK {
                    Self::Data(detail)
                } else {
                    Self::Integrity(detail)
                }
            }
            _ => Self::Sqlite(err),
        }
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
