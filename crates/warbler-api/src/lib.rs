pub mod auth;
pub mod error;
pub mod home;
pub mod likes;
pub mod messages;
pub mod session;
pub mod state;
pub mod templates;
pub mod users;

use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;

use warbler_types::api::FlashCategory;

pub use error::AppError;
pub use session::{CURR_USER_KEY, SESSION_COOKIE, Session};
pub use state::{AppState, AppStateInner};

/// All Warbler routes. Tracing and static files are layered on by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::homepage))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(users::edit_profile_form).post(users::edit_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/users/follow/{user_id}", post(users::start_following))
        .route("/users/stop-following/{user_id}", post(users::stop_following))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/messages/new", get(messages::new_message_form).post(messages::add_message))
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .route("/messages/{message_id}/like", post(likes::toggle_like))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

/// `302 Found` redirect.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Persist the session and render `html`.
pub(crate) fn page(session: Session, jar: CookieJar, secret: &str, html: String) -> Result<Response, AppError> {
    Ok((session.save(jar, secret)?, Html(html)).into_response())
}

/// Persist the session and redirect.
pub(crate) fn redirect(session: Session, jar: CookieJar, secret: &str, location: &str) -> Result<Response, AppError> {
    Ok((session.save(jar, secret)?, found(location)).into_response())
}

/// Flash "Access unauthorized." and send the visitor home.
pub(crate) fn unauthorized(mut session: Session, jar: CookieJar, secret: &str) -> Result<Response, AppError> {
    session.flash(FlashCategory::Danger, "Access unauthorized.");
    redirect(session, jar, secret, "/")
}
