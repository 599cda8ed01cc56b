//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `PARLOR_HOST`, default `0.0.0.0`
    pub host: String,

    /// Env: `PARLOR_PORT`, default `3000`
    pub port: u16,

    /// SQLite file. Env: `PARLOR_DB_PATH`, default `parlor.db`
    pub db_path: PathBuf,

    /// HS256 signing key for session tokens.
    /// Env: `PARLOR_JWT_SECRET`. The development default is refused when
    /// `PARLOR_ENV=production`.
    pub jwt_secret: String,

    /// Remote classifier endpoint. When set it takes precedence over the
    /// keyword lists.
    /// Env: `PARLOR_MODERATION_URL`
    pub moderation_url: Option<String>,

    /// Comma-separated words that reject a message in moderated
    /// conversations. Env: `PARLOR_BLOCKED_WORDS`
    pub blocked_words: Vec<String>,

    /// Comma-separated words that flag a message for review.
    /// Env: `PARLOR_FLAGGED_WORDS`
    pub flagged_words: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            db_path: PathBuf::from("parlor.db"),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            moderation_url: None,
            blocked_words: Vec::new(),
            flagged_words: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("PARLOR_HOST") {
            config.host = host;
        }

        if let Some(port) = lookup("PARLOR_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PARLOR_PORT: {}", port))?;
        }

        if let Some(path) = lookup("PARLOR_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(secret) = lookup("PARLOR_JWT_SECRET").filter(|s| !s.is_empty()) {
            config.jwt_secret = secret;
        }

        let production = lookup("PARLOR_ENV").is_some_and(|env| env.eq_ignore_ascii_case("production"));
        if production && config.jwt_secret == DEV_JWT_SECRET {
            bail!("PARLOR_JWT_SECRET must be set in production");
        }
        if config.jwt_secret == DEV_JWT_SECRET {
            tracing::warn!("Using the development JWT secret");
        }

        config.moderation_url = lookup("PARLOR_MODERATION_URL").filter(|url| !url.trim().is_empty());
        config.blocked_words = lookup("PARLOR_BLOCKED_WORDS")
            .map(|v| split_words(&v))
            .unwrap_or_default();
        config.flagged_words = lookup("PARLOR_FLAGGED_WORDS")
            .map(|v| split_words(&v))
            .unwrap_or_default();

        Ok(config)
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}

fn split_words(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_path, PathBuf::from("parlor.db"));
        assert!(config.moderation_url.is_none());
        assert_eq!(config.addr().unwrap(), ([0, 0, 0, 0], 3000).into());
    }

    #[test]
    fn word_lists_are_trimmed() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("PARLOR_BLOCKED_WORDS", " spoiler, ,leak "),
            ("PARLOR_FLAGGED_WORDS", "heck"),
        ]))
        .unwrap();
        assert_eq!(config.blocked_words, vec!["spoiler", "leak"]);
        assert_eq!(config.flagged_words, vec!["heck"]);
    }

    #[test]
    fn production_refuses_dev_secret() {
        assert!(ServerConfig::from_lookup(lookup(&[("PARLOR_ENV", "production")])).is_err());

        let config = ServerConfig::from_lookup(lookup(&[
            ("PARLOR_ENV", "production"),
            ("PARLOR_JWT_SECRET", "a-real-secret"),
        ]))
        .unwrap();
        assert_eq!(config.jwt_secret, "a-real-secret");
    }

    #[test]
    fn bad_port_is_an_error() {
        assert!(ServerConfig::from_lookup(lookup(&[("PARLOR_PORT", "http")])).is_err());
    }
}
