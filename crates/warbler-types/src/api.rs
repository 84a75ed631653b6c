use serde::{Deserialize, Serialize};

/// Maximum length of a warble, in characters.
pub const MESSAGE_MAX_LEN: usize = 140;

/// Minimum password length accepted by the signup form.
pub const PASSWORD_MIN_LEN: usize = 6;

// -- Session --

/// Session key holding the logged-in user's id.
pub const CURR_USER_KEY: &str = "curr_user";

/// Contents of the signed session cookie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curr_user: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<Flash>,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Danger => "danger",
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl SignupForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username is required".into());
        }
        if !looks_like_email(&self.email) {
            return Err("Invalid email address".into());
        }
        if self.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(format!(
                "Password must be at least {} characters",
                PASSWORD_MIN_LEN
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct MessageForm {
    pub text: String,
}

impl MessageForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.text.trim().is_empty() {
            return Err("Message text is required".into());
        }
        if self.text.chars().count() > MESSAGE_MAX_LEN {
            return Err(format!(
                "Messages are limited to {} characters",
                MESSAGE_MAX_LEN
            ));
        }
        Ok(())
    }
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
}

/// Profile edit form. `password` must match the current password.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub header_image_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub password: String,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username is required".into());
        }
        if !looks_like_email(&self.email) {
            return Err("Invalid email address".into());
        }
        Ok(())
    }
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_form_requires_all_fields() {
        let missing = serde_json::from_value::<SignupForm>(serde_json::json!({ "username": "u5" }));
        assert!(missing.is_err());

        let ok = serde_json::from_value::<SignupForm>(serde_json::json!({
            "username": "u5",
            "email": "u5@email.com",
            "password": "password",
        }))
        .unwrap();
        assert!(ok.image_url.is_none());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn signup_form_validation() {
        let form = SignupForm {
            username: "u1".into(),
            email: "not-an-email".into(),
            password: "password".into(),
            image_url: None,
        };
        assert!(form.validate().is_err());

        let form = SignupForm {
            username: "u1".into(),
            email: "u1@email.com".into(),
            password: "short".into(),
            image_url: None,
        };
        assert!(form.validate().is_err());
    }

    #[test]
    fn message_form_length_limit() {
        let ok = MessageForm { text: "a".repeat(MESSAGE_MAX_LEN) };
        assert!(ok.validate().is_ok());

        let long = MessageForm { text: "a".repeat(MESSAGE_MAX_LEN + 1) };
        assert!(long.validate().is_err());

        let blank = MessageForm { text: "   ".into() };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn session_claims_use_curr_user_key() {
        let claims = SessionClaims {
            curr_user: Some(7),
            flashes: vec![],
            exp: 0,
        };
        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(value[CURR_USER_KEY], 7);
        assert!(value.get("flashes").is_none());
    }
}
