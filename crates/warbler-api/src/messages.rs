use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use warbler_db::MessageRow;
use warbler_types::api::MessageForm;
use warbler_types::models::{Message, User};

use crate::error::AppError;
use crate::session::Session;
use crate::state::{AppState, current_user, run_db};
use crate::templates::{self, Page};
use crate::{page, redirect, unauthorized};

/// GET /messages/new
pub async fn new_message_form(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let viewer = User::from(&viewer);
    let flashes = session.take_flashes();
    let html = templates::message_new(&Page { user: Some(&viewer), flashes: &flashes }, None, "");
    page(session, jar, &state.secret_key, html)
}

/// POST /messages/new: post a warble, then show the author's profile.
pub async fn add_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    if let Err(msg) = form.validate() {
        let shown = User::from(&viewer);
        let html = templates::message_new(&Page { user: Some(&shown), flashes: &[] }, Some(&msg), &form.text);
        return page(session, jar, &state.secret_key, html);
    }

    let user_id = viewer.id;
    let text = form.text.clone();
    let result = run_db(&state, move |conn| MessageRow::create(conn, user_id, &text)).await;

    match result {
        Ok(message) => {
            info!("User {} posted message {}", user_id, message.id);
            redirect(session, jar, &state.secret_key, &format!("/users/{}", user_id))
        }
        Err(AppError::Db(e)) if e.is_data() => {
            let shown = User::from(&viewer);
            let html = templates::message_new(
                &Page { user: Some(&shown), flashes: &[] },
                Some("Message is too long"),
                &form.text,
            );
            page(session, jar, &state.secret_key, html)
        }
        Err(e) => Err(e),
    }
}

/// GET /messages/{id}
pub async fn show_message(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let viewer = current_user(&state, &session).await?.map(|u| User::from(&u));

    let row = run_db(&state, move |conn| MessageRow::get(conn, message_id))
        .await?
        .ok_or(AppError::NotFound)?;
    let message = Message::from(&row);

    let flashes = session.take_flashes();
    let html = templates::message_show(&Page { user: viewer.as_ref(), flashes: &flashes }, &message);
    page(session, jar, &state.secret_key, html)
}

/// POST /messages/{id}/delete: only the author may delete.
pub async fn delete_message(
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

    if message.user_id != viewer.id {
        return unauthorized(session, jar, &state.secret_key);
    }

    run_db(&state, move |conn| MessageRow::delete(conn, message_id)).await?;
    info!("User {} deleted message {}", viewer.id, message_id);

    redirect(session, jar, &state.secret_key, &format!("/users/{}", viewer.id))
}
