use axum::{extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;

use warbler_db::{LikeRow, MessageRow};
use warbler_types::models::{Message, User};

use crate::error::AppError;
use crate::page;
use crate::session::Session;
use crate::state::{AppState, current_user, run_db};
use crate::templates::{self, Page};

/// Timeline length on the homepage.
const HOMEPAGE_LIMIT: u32 = 100;

/// GET /: landing page when logged out, timeline when logged in.
pub async fn homepage(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);

    let Some(user) = current_user(&state, &session).await? else {
        let flashes = session.take_flashes();
        let html = templates::home_anon(&Page { user: None, flashes: &flashes });
        return page(session, jar, &state.secret_key, html);
    };

    let viewer = User::from(&user);
    let (stats, rows, liked) = run_db(&state, move |conn| {
        Ok((
            user.stats(conn)?,
            MessageRow::timeline(conn, user.id, HOMEPAGE_LIMIT)?,
            LikeRow::liked_message_ids(conn, user.id)?,
        ))
    })
    .await?;
    let messages: Vec<Message> = rows.iter().map(Message::from).collect();

    let flashes = session.take_flashes();
    let html = templates::home(
        &Page { user: Some(&viewer), flashes: &flashes },
        &viewer,
        &stats,
        &messages,
        &liked,
    );
    page(session, jar, &state.secret_key, html)
}
