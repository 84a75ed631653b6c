use axum::{Form, extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use warbler_db::{NewUser, UserRow};
use warbler_types::api::{FlashCategory, LoginForm, SignupForm};

use crate::error::AppError;
use crate::session::Session;
use crate::state::{AppState, run_db};
use crate::templates::{self, Page};
use crate::{page, redirect};

pub async fn signup_form(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let flashes = session.take_flashes();
    let html = templates::signup_page(&Page { user: None, flashes: &flashes }, None);
    page(session, jar, &state.secret_key, html)
}

/// POST /signup: create the account and log it in.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);

    if let Err(msg) = form.validate() {
        let html = templates::signup_page(&Page { user: None, flashes: &[] }, Some(&msg));
        return page(session, jar, &state.secret_key, html);
    }

    let result = run_db(&state, move |conn| {
        let new = NewUser {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            image_url: form.image_url.as_deref(),
        };
        UserRow::signup(conn, new)
    })
    .await;

    let user = match result {
        Ok(user) => user,
        Err(AppError::Db(e)) if e.is_integrity() => {
            let html = templates::signup_page(
                &Page { user: None, flashes: &[] },
                Some("Username or email already taken"),
            );
            return page(session, jar, &state.secret_key, html);
        }
        Err(e) => return Err(e),
    };

    info!("New user signed up: {} ({})", user.username, user.id);
    session.login(user.id);
    redirect(session, jar, &state.secret_key, "/")
}

pub async fn login_form(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let flashes = session.take_flashes();
    let html = templates::login_page(&Page { user: None, flashes: &flashes }, None);
    page(session, jar, &state.secret_key, html)
}

/// POST /login: authenticate and greet, or re-show the form.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);

    let authed = run_db(&state, move |conn| {
        UserRow::authenticate(conn, &form.username, &form.password)
    })
    .await?;

    match authed {
        Some(user) => {
            info!("User logged in: {} ({})", user.username, user.id);
            session.login(user.id);
            session.flash(FlashCategory::Success, format!("Hello, {}!", user.username));
            redirect(session, jar, &state.secret_key, "/")
        }
        None => {
            session.flash(FlashCategory::Danger, "Invalid credentials.");
            let flashes = session.take_flashes();
            let html = templates::login_page(&Page { user: None, flashes: &flashes }, None);
            page(session, jar, &state.secret_key, html)
        }
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    session.logout();
    session.flash(FlashCategory::Success, "You have successfully logged out.");
    redirect(session, jar, &state.secret_key, "/login")
}
