//! Signed-cookie sessions.
//!
//! The whole session lives client-side in one cookie: a JWT signed with the
//! app's secret key whose claims are [`SessionClaims`]. A cookie that fails
//! verification is treated as an empty session.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use warbler_types::api::{Flash, FlashCategory, SessionClaims};

pub use warbler_types::api::CURR_USER_KEY;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_LIFETIME_DAYS: i64 = 31;

#[derive(Debug, Clone, Default)]
pub struct Session {
    claims: SessionClaims,
    dirty: bool,
}

impl Session {
    pub fn from_jar(jar: &CookieJar, secret: &str) -> Self {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Self::default();
        };

        match decode_claims(cookie.value(), secret) {
            Ok(claims) => Self {
                claims,
                dirty: false,
            },
            Err(e) => {
                debug!("Ignoring invalid session cookie: {}", e);
                Self::default()
            }
        }
    }

    pub fn user_id(&self) -> Option<i64> {
        self.claims.curr_user
    }

    pub fn login(&mut self, user_id: i64) {
        self.claims.curr_user = Some(user_id);
        self.dirty = true;
    }

    pub fn logout(&mut self) {
        if self.claims.curr_user.take().is_some() {
            self.dirty = true;
        }
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        self.claims.flashes.push(Flash {
            category,
            message: message.into(),
        });
        self.dirty = true;
    }

    /// Pending flashes, cleared from the session.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        if self.claims.flashes.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.claims.flashes)
    }

    /// Write the session back into `jar` if anything changed.
    pub fn save(mut self, jar: CookieJar, secret: &str) -> Result<CookieJar, AppError> {
        if !self.dirty {
            return Ok(jar);
        }
        self.claims.exp = expiry();
        let token = encode_claims(&self.claims, secret)?;
        Ok(jar.add(session_cookie(token)))
    }
}

pub fn encode_claims(claims: &SessionClaims, secret: &str) -> jsonwebtoken::errors::Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_claims(token: &str, secret: &str) -> jsonwebtoken::errors::Result<SessionClaims> {
    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// A `Cookie` header value that logs in `user_id`.
pub fn login_cookie(user_id: i64, secret: &str) -> jsonwebtoken::errors::Result<String> {
    let claims = SessionClaims {
        curr_user: Some(user_id),
        flashes: Vec::new(),
        exp: expiry(),
    };
    Ok(format!("{}={}", SESSION_COOKIE, encode_claims(&claims, secret)?))
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn expiry() -> usize {
    (chrono::Utc::now() + chrono::Duration::days(SESSION_LIFETIME_DAYS)).timestamp() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn jar_with(value: String) -> CookieJar {
        CookieJar::new().add(Cookie::new(SESSION_COOKIE, value))
    }

    fn token_in(jar: &CookieJar) -> String {
        jar.get(SESSION_COOKIE).unwrap().value().to_string()
    }

    #[test]
    fn empty_jar_is_anonymous() {
        let session = Session::from_jar(&CookieJar::new(), SECRET);
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn login_survives_a_round_trip() {
        let mut session = Session::default();
        session.login(42);
        let jar = session.save(CookieJar::new(), SECRET).unwrap();

        let restored = Session::from_jar(&jar_with(token_in(&jar)), SECRET);
        assert_eq!(restored.user_id(), Some(42));
    }

    #[test]
    fn wrong_key_is_anonymous() {
        let mut session = Session::default();
        session.login(42);
        let jar = session.save(CookieJar::new(), SECRET).unwrap();

        let restored = Session::from_jar(&jar_with(token_in(&jar)), "another-secret");
        assert_eq!(restored.user_id(), None);

        let garbage = Session::from_jar(&jar_with("not-a-token".into()), SECRET);
        assert_eq!(garbage.user_id(), None);
    }

    #[test]
    fn unchanged_session_is_not_rewritten() {
        let session = Session::default();
        let jar = session.save(CookieJar::new(), SECRET).unwrap();
        assert!(jar.get(SESSION_COOKIE).is_none());
    }

    #[test]
    fn flashes_are_shown_once() {
        let mut session = Session::default();
        session.flash(FlashCategory::Danger, "Access unauthorized.");
        let jar = session.save(CookieJar::new(), SECRET).unwrap();

        let mut next = Session::from_jar(&jar_with(token_in(&jar)), SECRET);
        let flashes = next.take_flashes();
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].message, "Access unauthorized.");

        let jar = next.save(CookieJar::new(), SECRET).unwrap();
        let mut after = Session::from_jar(&jar_with(token_in(&jar)), SECRET);
        assert!(after.take_flashes().is_empty());
    }

    #[test]
    fn login_cookie_is_readable() {
        let header = login_cookie(7, SECRET).unwrap();
        let (name, token) = header.split_once('=').unwrap();
        assert_eq!(name, SESSION_COOKIE);
        assert_eq!(decode_claims(token, SECRET).unwrap().curr_user, Some(7));
    }

    #[test]
    fn logout_clears_user() {
        let mut session = Session::default();
        session.login(1);
        session.logout();
        assert_eq!(session.user_id(), None);
    }
}
