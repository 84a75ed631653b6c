use axum::{
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use warbler_db::{LikeRow, MessageRow};

use crate::error::AppError;
use crate::session::Session;
use crate::state::{AppState, current_user, run_db};
use crate::{redirect, unauthorized};

/// POST /messages/{id}/like: like or unlike someone else's message.
pub async fn toggle_like(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let message = run_db(&state, move |conn| MessageRow::get(conn, message_id))
        .await?
        .ok_or(AppError::NotFound)?;

    if message.user_id == viewer.id {
        return Err(AppError::Forbidden);
    }

    let viewer_id = viewer.id;
    let added = run_db(&state, move |conn| LikeRow::toggle(conn, viewer_id, message_id)).await?;
    debug!("User {} like on message {}: {}", viewer_id, message_id, added);

    redirect(session, jar, &state.secret_key, "/")
}
