use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Secrets that MUST NOT be used to sign sessions.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "it's a secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub reset_db: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("SECRET_KEY").unwrap_or_default();
        if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            bail!("SECRET_KEY is unset or still a placeholder; set it in your .env file");
        }

        let port = match lookup("WARBLER_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("WARBLER_PORT is not a port number: {raw}"))?,
            None => 5000,
        };

        let reset_db = lookup("WARBLER_RESET_DB")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "warbler.db".into()),
            secret_key,
            host: lookup("WARBLER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            static_dir: lookup("WARBLER_STATIC_DIR").unwrap_or_else(|| "static".into()).into(),
            reset_db,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
