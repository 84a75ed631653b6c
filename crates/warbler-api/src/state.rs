use std::sync::Arc;

use tracing::error;
use warbler_db::{Connection, Database, UserRow};

use crate::error::AppError;
use crate::session::Session;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Key that signs session cookies.
    pub secret_key: String,
}

impl AppStateInner {
    pub fn new(db: Database, secret_key: impl Into<String>) -> AppState {
        Arc::new(Self {
            db,
            secret_key: secret_key.into(),
        })
    }
}

/// Run a blocking DB closure off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Connection) -> warbler_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.with_conn(f))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            AppError::Join
        })?
        .map_err(AppError::from)
}

/// The logged-in user, if the session names one that still exists.
pub async fn current_user(state: &AppState, session: &Session) -> Result<Option<UserRow>, AppError> {
    match session.user_id() {
        Some(id) => run_db(state, move |conn| UserRow::get(conn, id)).await,
        None => Ok(None),
    }
}
