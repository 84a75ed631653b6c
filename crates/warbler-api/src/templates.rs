//! HTML templates for the web interface
//!
//! Simple inline HTML templates without a template engine.

use std::collections::HashSet;

use warbler_db::UserStats;
use warbler_types::api::Flash;
use warbler_types::models::{Message, User};

/// Marker the logged-in homepage carries.
pub const USER_HOMEPAGE_MARKER: &str = "<!-- User homepage -->";

/// Common CSS styles for all pages
const COMMON_STYLES: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, "Helvetica Neue", Arial, sans-serif;
        margin: 0;
        background: #f5f8fa;
        color: #14171a;
    }
    nav {
        background: white;
        border-bottom: 1px solid #e1e8ed;
        padding: 10px 20px;
        display: flex;
        justify-content: space-between;
        align-items: center;
    }
    nav a { color: #1da1f2; text-decoration: none; margin-right: 15px; }
    nav form { display: inline; }
    .container { max-width: 1000px; margin: 20px auto; padding: 0 20px; }
    .alert { padding: 10px; border-radius: 4px; margin: 10px 0; }
    .alert-success { background: #dff0d8; color: #3c763d; }
    .alert-danger { background: #f2dede; color: #a94442; }
    .home-hero {
        text-align: center;
        padding: 80px 20px;
        background: #1da1f2;
        color: white;
        border-radius: 8px;
    }
    .home-hero a { color: white; font-weight: bold; }
    .card-image, .timeline-image { width: 48px; height: 48px; border-radius: 50%; }
    .profile-avatar { width: 120px; height: 120px; border-radius: 50%; border: 4px solid white; }
    .header-image { width: 100%; height: 180px; object-fit: cover; }
    .messages { list-style: none; padding: 0; }
    .list-group-item { background: white; border: 1px solid #e1e8ed; padding: 12px; display: flex; gap: 12px; }
    .message-area { flex: 1; }
    .message-area span { color: #657786; font-size: 13px; margin-left: 6px; }
    .user-stats { display: flex; gap: 20px; list-style: none; padding: 0; }
    .user-stats li { text-align: center; }
    .card { background: white; border: 1px solid #e1e8ed; border-radius: 6px; padding: 12px; margin: 8px 0; }
    .form-group { margin: 12px 0; }
    input[type="text"], input[type="email"], input[type="password"], input[type="url"], textarea {
        width: 100%;
        padding: 10px;
        border: 1px solid #ddd;
        border-radius: 4px;
        box-sizing: border-box;
    }
    .btn { padding: 6px 14px; border-radius: 16px; border: 1px solid #1da1f2; cursor: pointer; }
    .btn-primary { background: #1da1f2; color: white; }
    .btn-outline-primary { background: white; color: #1da1f2; }
    .btn-danger { background: #e0245e; border-color: #e0245e; color: white; }
"#;

/// What every page needs: the viewer and any pending flashes.
pub struct Page<'a> {
    pub user: Option<&'a User>,
    pub flashes: &'a [Flash],
}

fn layout(page: &Page<'_>, title: &str, body: &str) -> String {
    let nav_links = match page.user {
        Some(user) => format!(
            r#"<a href="/users/{id}">@{username}</a>
            <a href="/messages/new">New Message</a>
            <form method="POST" action="/logout"><button type="submit" class="btn btn-outline-primary">Log out</button></form>"#,
            id = user.id,
            username = html_escape(&user.username),
        ),
        None => r#"<a href="/signup">Sign up</a>
            <a href="/login">Log in</a>"#
            .to_string(),
    };

    let flashes: String = page
        .flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<div class="alert alert-{}">{}</div>"#,
                flash.category.as_str(),
                html_escape(&flash.message)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{COMMON_STYLES}</style>
</head>
<body>
    <nav>
        <a href="/"><strong>Warbler</strong></a>
        <form method="GET" action="/users">
            <input name="q" type="text" placeholder="Search Warbler">
        </form>
        <div>{nav_links}</div>
    </nav>
    <div class="container">
        {flashes}
        {body}
    </div>
</body>
</html>"#,
        title = html_escape(title),
    )
}

/// Landing page for anonymous visitors
pub fn home_anon(page: &Page<'_>) -> String {
    let body = r#"<div class="home-hero">
            <h1>What's Happening?</h1>
            <h4>New to Warbler?</h4>
            <a href="/signup" class="btn btn-primary">Sign up now</a>
        </div>"#;
    layout(page, "Warbler", body)
}

/// Logged-in homepage: the viewer's card plus their timeline
pub fn home(page: &Page<'_>, user: &User, stats: &UserStats, messages: &[Message], liked: &HashSet<i64>) -> String {
    let body = format!(
        r#"{USER_HOMEPAGE_MARKER}
        <div class="row">
            <aside class="card" id="home-aside">
                <img src="{header}" alt="" class="header-image">
                <a href="/users/{id}">
                    <img src="{image}" alt="Image for {username}" class="card-image">
                    <p>@{username}</p>
                </a>
                {stats}
            </aside>
            <div class="col">
                {messages}
            </div>
        </div>"#,
        header = html_escape(&user.header_image_url),
        image = html_escape(&user.image_url),
        id = user.id,
        username = html_escape(&user.username),
        stats = stats_list(user, stats),
        messages = message_list(messages, Some(user), liked),
    );
    layout(page, "Warbler", &body)
}

/// Render the signup page
pub fn signup_page(page: &Page<'_>, error: Option<&str>) -> String {
    let body = format!(
        r#"<h2>Join Warbler today.</h2>
        {error}
        <form method="POST" action="/signup" id="user_form">
            <div class="form-group"><input type="text" name="username" placeholder="Username" required></div>
            <div class="form-group"><input type="email" name="email" placeholder="E-mail" required></div>
            <div class="form-group"><input type="password" name="password" placeholder="Password" required></div>
            <div class="form-group"><input type="url" name="image_url" placeholder="(Optional) Image URL"></div>
            <button type="submit" class="btn btn-primary">Sign me up!</button>
        </form>"#,
        error = error_html(error),
    );
    layout(page, "Sign up", &body)
}

/// Render the login page
pub fn login_page(page: &Page<'_>, error: Option<&str>) -> String {
    let body = format!(
        r#"<h2>Welcome back.</h2>
        {error}
        <form method="POST" action="/login" id="user_form">
            <div class="form-group"><input type="text" name="username" placeholder="Username" required autofocus></div>
            <div class="form-group"><input type="password" name="password" placeholder="Password" required></div>
            <button type="submit" class="btn btn-primary">Log in</button>
        </form>"#,
        error = error_html(error),
    );
    layout(page, "Log in", &body)
}

/// User directory, optionally filtered by a search
pub fn users_index(page: &Page<'_>, users: &[User], query: Option<&str>) -> String {
    let cards = if users.is_empty() {
        "<h3>Sorry, no users found</h3>".to_string()
    } else {
        user_cards(users)
    };

    let heading = match query {
        Some(q) if !q.trim().is_empty() => format!("<h2>Users matching \"{}\"</h2>", html_escape(q)),
        _ => "<h2>All users</h2>".to_string(),
    };

    layout(page, "Users", &format!("{heading}\n{cards}"))
}

/// Profile page with the user's messages.
///
/// `follow_state` is `Some(following)` when the viewer can follow or
/// unfollow this user, `None` on the viewer's own profile or when logged out.
pub fn user_show(
    page: &Page<'_>,
    profile: &User,
    stats: &UserStats,
    messages: &[Message],
    liked: &HashSet<i64>,
    follow_state: Option<bool>,
) -> String {
    let action = match follow_state {
        Some(true) => format!(
            r#"<form method="POST" action="/users/stop-following/{}"><button class="btn btn-primary">Unfollow</button></form>"#,
            profile.id
        ),
        Some(false) => format!(
            r#"<form method="POST" action="/users/follow/{}"><button class="btn btn-outline-primary">Follow</button></form>"#,
            profile.id
        ),
        None if is_viewer(page, profile) => r#"<a href="/users/profile" class="btn btn-outline-primary">Edit Profile</a>
            <form method="POST" action="/users/delete"><button class="btn btn-danger">Delete Profile</button></form>"#
            .to_string(),
        None => String::new(),
    };

    let body = format!(
        "{header}\n{action}\n<ul class=\"messages\" id=\"messages\">{messages}</ul>",
        header = profile_header(profile, stats),
        messages = message_items(messages, page.user, liked),
    );
    layout(page, &format!("@{}", profile.username), &body)
}

/// Followers or following list for `profile`
pub fn follow_list(page: &Page<'_>, profile: &User, stats: &UserStats, heading: &str, users: &[User]) -> String {
    let cards = if users.is_empty() {
        "<p>Nobody here yet.</p>".to_string()
    } else {
        user_cards(users)
    };

    let body = format!(
        "{header}\n<h3>{heading}</h3>\n{cards}",
        header = profile_header(profile, stats),
        heading = html_escape(heading),
    );
    layout(page, &format!("@{} · {}", profile.username, heading), &body)
}

/// Messages `profile` has liked
pub fn likes_page(page: &Page<'_>, profile: &User, stats: &UserStats, messages: &[Message], liked: &HashSet<i64>) -> String {
    let body = format!(
        "{header}\n<h3>Likes</h3>\n{messages}",
        header = profile_header(profile, stats),
        messages = message_list(messages, page.user, liked),
    );
    layout(page, &format!("@{} · Likes", profile.username), &body)
}

/// New message form
pub fn message_new(page: &Page<'_>, error: Option<&str>, text: &str) -> String {
    let body = format!(
        r#"<h2>Add my message!</h2>
        {error}
        <form method="POST" action="/messages/new">
            <div class="form-group">
                <textarea name="text" rows="3" placeholder="What's happening?" required>{text}</textarea>
            </div>
            <button type="submit" class="btn btn-primary">Add my message!</button>
        </form>"#,
        error = error_html(error),
        text = html_escape(text),
    );
    layout(page, "New message", &body)
}

/// A single message
pub fn message_show(page: &Page<'_>, message: &Message) -> String {
    let delete = match page.user {
        Some(viewer) if viewer.id == message.user_id => format!(
            r#"<form method="POST" action="/messages/{}/delete"><button class="btn btn-danger">Delete</button></form>"#,
            message.id
        ),
        _ => String::new(),
    };

    let body = format!(
        r#"<div class="card message-show">
            <a href="/users/{user_id}">
                <img src="{image}" alt="" class="timeline-image">
            </a>
            <a href="/users/{user_id}">@{username}</a>
            <p class="single-message">{text}</p>
            <span>{date}</span>
            {delete}
        </div>"#,
        user_id = message.user_id,
        image = html_escape(&message.author_image_url),
        username = html_escape(&message.author_username),
        text = html_escape(&message.text),
        date = message.timestamp.format("%d %B %Y"),
    );
    layout(page, "Message", &body)
}

/// Profile edit form, prefilled with the current values
pub fn profile_edit(page: &Page<'_>, user: &User, error: Option<&str>) -> String {
    let body = format!(
        r#"<h2>Edit Your Profile.</h2>
        {error}
        <form method="POST" action="/users/profile" id="user_form">
            <div class="form-group"><input type="text" name="username" value="{username}" required></div>
            <div class="form-group"><input type="email" name="email" value="{email}" required></div>
            <div class="form-group"><input type="url" name="image_url" value="{image}" placeholder="(Optional) Image URL"></div>
            <div class="form-group"><input type="url" name="header_image_url" value="{header}" placeholder="(Optional) Header Image URL"></div>
            <div class="form-group"><textarea name="bio" placeholder="(Optional) Tell us about yourself">{bio}</textarea></div>
            <div class="form-group"><input type="text" name="location" value="{location}" placeholder="(Optional) Location"></div>
            <p>To confirm changes, enter your password:</p>
            <div class="form-group"><input type="password" name="password" placeholder="Password" required></div>
            <button type="submit" class="btn btn-primary">Edit this user!</button>
            <a href="/users/{id}" class="btn btn-outline-primary">Cancel</a>
        </form>"#,
        error = error_html(error),
        username = html_escape(&user.username),
        email = html_escape(&user.email),
        image = html_escape(&user.image_url),
        header = html_escape(&user.header_image_url),
        bio = html_escape(user.bio.as_deref().unwrap_or("")),
        location = html_escape(user.location.as_deref().unwrap_or("")),
        id = user.id,
    );
    layout(page, "Edit profile", &body)
}

pub fn not_found() -> String {
    bare_page("Not found", "<h1>404</h1><p>Sorry, we can't find that page.</p>")
}

pub fn forbidden() -> String {
    bare_page("Forbidden", "<h1>403</h1><p>You are not allowed to do that.</p>")
}

pub fn server_error() -> String {
    bare_page("Error", "<h1>500</h1><p>Something went wrong. Please try again.</p>")
}

fn bare_page(title: &str, body: &str) -> String {
    layout(&Page { user: None, flashes: &[] }, title, body)
}

fn is_viewer(page: &Page<'_>, profile: &User) -> bool {
    page.user.is_some_and(|viewer| viewer.id == profile.id)
}

fn profile_header(profile: &User, stats: &UserStats) -> String {
    let bio = profile
        .bio
        .as_deref()
        .map(|bio| format!(r#"<p class="user-bio">{}</p>"#, html_escape(bio)))
        .unwrap_or_default();
    let location = profile
        .location
        .as_deref()
        .map(|loc| format!(r#"<p class="user-location">{}</p>"#, html_escape(loc)))
        .unwrap_or_default();

    format!(
        r#"<div id="warbler-hero">
            <img src="{header}" alt="" class="header-image">
        </div>
        <img src="{image}" alt="Image for {username}" id="profile-avatar" class="profile-avatar">
        <h4 id="sidebar-username">@{username}</h4>
        {bio}
        {location}
        {stats}"#,
        header = html_escape(&profile.header_image_url),
        image = html_escape(&profile.image_url),
        username = html_escape(&profile.username),
        stats = stats_list(profile, stats),
    )
}

fn stats_list(user: &User, stats: &UserStats) -> String {
    format!(
        r#"<ul class="user-stats">
            <li><a href="/users/{id}">Messages</a> <h4>{messages}</h4></li>
            <li><a href="/users/{id}/following">Following</a> <h4>{following}</h4></li>
            <li><a href="/users/{id}/followers">Followers</a> <h4>{followers}</h4></li>
            <li><a href="/users/{id}/likes">Likes</a> <h4>{likes}</h4></li>
        </ul>"#,
        id = user.id,
        messages = stats.messages,
        following = stats.following,
        followers = stats.followers,
        likes = stats.likes,
    )
}

fn user_cards(users: &[User]) -> String {
    users
        .iter()
        .map(|user| {
            let bio = user
                .bio
                .as_deref()
                .map(|bio| format!(r#"<p class="card-bio">{}</p>"#, html_escape(bio)))
                .unwrap_or_default();
            format!(
                r#"<div class="card user-card">
                <a href="/users/{id}">
                    <img src="{image}" alt="Image for {username}" class="card-image">
                    <p>@{username}</p>
                </a>
                {bio}
            </div>"#,
                id = user.id,
                image = html_escape(&user.image_url),
                username = html_escape(&user.username),
            )
        })
        .collect()
}

fn message_list(messages: &[Message], viewer: Option<&User>, liked: &HashSet<i64>) -> String {
    if messages.is_empty() {
        return "<p>No messages yet.</p>".to_string();
    }
    format!(
        r#"<ul class="messages" id="messages">{}</ul>"#,
        message_items(messages, viewer, liked)
    )
}

fn message_items(messages: &[Message], viewer: Option<&User>, liked: &HashSet<i64>) -> String {
    messages
        .iter()
        .map(|msg| {
            let like = match viewer {
                Some(viewer) if viewer.id != msg.user_id => {
                    let class = if liked.contains(&msg.id) { "btn-primary" } else { "btn-outline-primary" };
                    format!(
                        r#"<form method="POST" action="/messages/{}/like" class="messages-like">
                        <button class="btn {}">&#9733;</button>
                    </form>"#,
                        msg.id, class
                    )
                }
                _ => String::new(),
            };

            format!(
                r#"<li class="list-group-item">
                <a href="/messages/{id}" class="message-link"></a>
                <a href="/users/{user_id}">
                    <img src="{image}" alt="" class="timeline-image">
                </a>
                <div class="message-area">
                    <a href="/users/{user_id}">@{username}</a>
                    <span>{date}</span>
                    <p>{text}</p>
                </div>
                {like}
            </li>"#,
                id = msg.id,
                user_id = msg.user_id,
                image = html_escape(&msg.author_image_url),
                username = html_escape(&msg.author_username),
                date = msg.timestamp.format("%d %B %Y"),
                text = html_escape(&msg.text),
            )
        })
        .collect()
}

fn error_html(error: Option<&str>) -> String {
    error.map_or(String::new(), |e| {
        format!(r#"<div class="alert alert-danger">{}</div>"#, html_escape(e))
    })
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbler_types::api::FlashCategory;

    fn user() -> User {
        User {
            id: 1,
            username: "u1".into(),
            email: "u1@email.com".into(),
            image_url: "/static/images/default-pic.png".into(),
            header_image_url: "/static/images/warbler-hero.jpg".into(),
            bio: None,
            location: None,
        }
    }

    #[test]
    fn escapes_user_content() {
        assert_eq!(
            html_escape(r#"<script>alert("x")</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt;"
        );

        let mut evil = user();
        evil.username = "<b>bold</b>".into();
        let html = users_index(&Page { user: None, flashes: &[] }, &[evil], None);
        assert!(html.contains("@&lt;b&gt;bold&lt;/b&gt;"));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn layout_renders_flashes() {
        let flashes = vec![Flash {
            category: FlashCategory::Danger,
            message: "Access unauthorized.".into(),
        }];
        let html = home_anon(&Page { user: None, flashes: &flashes });
        assert!(html.contains(r#"<div class="alert alert-danger">Access unauthorized.</div>"#));
        assert!(html.contains(r#"<div class="home-hero">"#));
    }

    #[test]
    fn homepage_shows_avatar() {
        let u = user();
        let html = home(&Page { user: Some(&u), flashes: &[] }, &u, &UserStats::default(), &[], &HashSet::new());
        assert!(html.contains(USER_HOMEPAGE_MARKER));
        assert!(html.contains(r#"<img src="/static/images/default-pic.png""#));
        assert!(html.contains("No messages yet."));
    }

    #[test]
    fn own_profile_offers_edit_not_follow() {
        let u = user();
        let page = Page { user: Some(&u), flashes: &[] };
        let html = user_show(&page, &u, &UserStats::default(), &[], &HashSet::new(), None);
        assert!(html.contains("Edit Profile"));
        assert!(!html.contains("/users/follow/"));
    }
}
