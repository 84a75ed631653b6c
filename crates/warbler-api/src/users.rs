use std::collections::HashSet;

use axum::{
    Form,
    extract::{Path, Query, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use warbler_db::{FollowRow, LikeRow, ProfileUpdate, UserRow, UserStats};
use warbler_types::api::{FlashCategory, ProfileForm, UserSearchQuery};
use warbler_types::models::{Message, User};

use crate::error::AppError;
use crate::session::Session;
use crate::state::{AppState, current_user, run_db};
use crate::templates::{self, Page};
use crate::{page, redirect, unauthorized};

/// GET /users: directory, filtered by `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<UserSearchQuery>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let viewer = current_user(&state, &session).await?.map(|u| User::from(&u));

    let q = query.q.clone();
    let rows = run_db(&state, move |conn| UserRow::search(conn, q.as_deref())).await?;
    let users: Vec<User> = rows.iter().map(User::from).collect();

    let flashes = session.take_flashes();
    let html = templates::users_index(
        &Page { user: viewer.as_ref(), flashes: &flashes },
        &users,
        query.q.as_deref(),
    );
    page(session, jar, &state.secret_key, html)
}

/// GET /users/{id}: profile and messages.
pub async fn show_user(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let viewer = current_user(&state, &session).await?;
    let shown_viewer = viewer.as_ref().map(User::from);
    let (profile, stats) = load_profile(&state, user_id).await?;

    let target = profile.clone();
    let (rows, liked, follow_state) = run_db(&state, move |conn| {
        let rows = target.messages(conn)?;
        let (liked, follow_state) = match viewer {
            Some(viewer) => {
                let liked = LikeRow::liked_message_ids(conn, viewer.id)?;
                let follow_state = if viewer.id == target.id {
                    None
                } else {
                    Some(viewer.is_following(conn, &target)?)
                };
                (liked, follow_state)
            }
            None => (HashSet::new(), None),
        };
        Ok((rows, liked, follow_state))
    })
    .await?;
    let messages: Vec<Message> = rows.iter().map(Message::from).collect();

    let flashes = session.take_flashes();
    let html = templates::user_show(
        &Page { user: shown_viewer.as_ref(), flashes: &flashes },
        &User::from(&profile),
        &stats,
        &messages,
        &liked,
        follow_state,
    );
    page(session, jar, &state.secret_key, html)
}

/// GET /users/{id}/following
pub async fn show_following(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    follow_page(state, jar, user_id, Relation::Following).await
}

/// GET /users/{id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    follow_page(state, jar, user_id, Relation::Followers).await
}

#[derive(Clone, Copy)]
enum Relation {
    Following,
    Followers,
}

async fn follow_page(state: AppState, jar: CookieJar, user_id: i64, relation: Relation) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let (profile, stats) = load_profile(&state, user_id).await?;
    let target = profile.clone();
    let rows = run_db(&state, move |conn| match relation {
        Relation::Following => target.following(conn),
        Relation::Followers => target.followers(conn),
    })
    .await?;
    let users: Vec<User> = rows.iter().map(User::from).collect();

    let heading = match relation {
        Relation::Following => "Following",
        Relation::Followers => "Followers",
    };

    let viewer = User::from(&viewer);
    let flashes = session.take_flashes();
    let html = templates::follow_list(
        &Page { user: Some(&viewer), flashes: &flashes },
        &User::from(&profile),
        &stats,
        heading,
        &users,
    );
    page(session, jar, &state.secret_key, html)
}

/// GET /users/{id}/likes: messages this user liked.
pub async fn show_likes(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let (profile, stats) = load_profile(&state, user_id).await?;
    let target = profile.clone();
    let viewer_id = viewer.id;
    let (rows, liked) = run_db(&state, move |conn| {
        Ok((target.likes(conn)?, LikeRow::liked_message_ids(conn, viewer_id)?))
    })
    .await?;
    let messages: Vec<Message> = rows.iter().map(Message::from).collect();

    let viewer = User::from(&viewer);
    let flashes = session.take_flashes();
    let html = templates::likes_page(
        &Page { user: Some(&viewer), flashes: &flashes },
        &User::from(&profile),
        &stats,
        &messages,
        &liked,
    );
    page(session, jar, &state.secret_key, html)
}

/// POST /users/follow/{id}
pub async fn start_following(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(follow_id): Path<i64>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };
    let (followed, _) = load_profile(&state, follow_id).await?;

    if followed.id == viewer.id {
        session.flash(FlashCategory::Danger, "You can't follow yourself.");
        return redirect(session, jar, &state.secret_key, &format!("/users/{}", viewer.id));
    }

    let viewer_id = viewer.id;
    match run_db(&state, move |conn| FollowRow::create(conn, viewer_id, followed.id)).await {
        Ok(_) => {}
        // already following
        Err(AppError::Db(e)) if e.is_integrity() => {}
        Err(e) => return Err(e),
    }

    redirect(session, jar, &state.secret_key, &format!("/users/{}/following", viewer.id))
}

/// POST /users/stop-following/{id}
pub async fn stop_following(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(follow_id): Path<i64>,
) -> Result<Response, AppError> {
    let session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let viewer_id = viewer.id;
    run_db(&state, move |conn| FollowRow::delete(conn, viewer_id, follow_id)).await?;

    redirect(session, jar, &state.secret_key, &format!("/users/{}/following", viewer.id))
}

/// GET /users/profile
pub async fn edit_profile_form(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let viewer = User::from(&viewer);
    let flashes = session.take_flashes();
    let html = templates::profile_edit(&Page { user: Some(&viewer), flashes: &flashes }, &viewer, None);
    page(session, jar, &state.secret_key, html)
}

/// POST /users/profile: requires the current password.
pub async fn edit_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let username = viewer.username.clone();
    let password = form.password.clone();
    let authed = run_db(&state, move |conn| UserRow::authenticate(conn, &username, &password)).await?;
    let Some(mut user) = authed else {
        warn!("Profile edit with wrong password for user {}", viewer.id);
        session.flash(FlashCategory::Danger, "Wrong password, please try again.");
        return redirect(session, jar, &state.secret_key, "/");
    };

    if let Err(msg) = form.validate() {
        let shown = User::from(&viewer);
        let html = templates::profile_edit(&Page { user: Some(&shown), flashes: &[] }, &shown, Some(&msg));
        return page(session, jar, &state.secret_key, html);
    }

    let update = ProfileUpdate {
        username: form.username,
        email: form.email,
        image_url: form.image_url,
        header_image_url: form.header_image_url,
        bio: form.bio,
        location: form.location,
    };
    let user_id = user.id;
    let result = run_db(&state, move |conn| user.update_profile(conn, &update)).await;

    match result {
        Ok(()) => {
            info!("User {} updated their profile", user_id);
            redirect(session, jar, &state.secret_key, &format!("/users/{}", user_id))
        }
        Err(AppError::Db(e)) if e.is_integrity() => {
            let shown = User::from(&viewer);
            let html = templates::profile_edit(
                &Page { user: Some(&shown), flashes: &[] },
                &shown,
                Some("Username or email already taken"),
            );
            page(session, jar, &state.secret_key, html)
        }
        Err(e) => Err(e),
    }
}

/// POST /users/delete: remove the account and log out.
pub async fn delete_user(State(state): State<AppState>, jar: CookieJar) -> Result<Response, AppError> {
    let mut session = Session::from_jar(&jar, &state.secret_key);
    let Some(viewer) = current_user(&state, &session).await? else {
        return unauthorized(session, jar, &state.secret_key);
    };

    let viewer_id = viewer.id;
    run_db(&state, move |conn| UserRow::delete(conn, viewer_id)).await?;
    info!("Deleted user {} ({})", viewer.username, viewer.id);

    session.logout();
    redirect(session, jar, &state.secret_key, "/signup")
}

/// A user and their header counters, or 404.
async fn load_profile(state: &AppState, user_id: i64) -> Result<(UserRow, UserStats), AppError> {
    run_db(state, move |conn| {
        let Some(user) = UserRow::get(conn, user_id)? else {
            return Ok(None);
        };
        let stats = user.stats(conn)?;
        Ok(Some((user, stats)))
    })
    .await?
    .ok_or(AppError::NotFound)
}
