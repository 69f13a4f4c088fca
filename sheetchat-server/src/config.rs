//! Server configuration, loaded from environment variables at startup.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context as _;

use sheetchat_core::Settings;
use sheetchat_core::auth::DEFAULT_TOKEN_TTL;
use sheetchat_database::cache::{DEFAULT_CHAT_RATE_LIMIT_MAX_HITS, DEFAULT_CHAT_RATE_LIMIT_WINDOW};
use sheetchat_utils::parse::is_truthy;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,
    pub database_max_connections: u32,
    pub auto_run_migrations: bool,

    pub jwt_secret: String,
    pub jwt_ttl: Duration,

    pub redis_enabled: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub chat_rate_limit_window: Duration,
    pub chat_rate_limit_max_hits: u64,

    /// Emit newline-delimited JSON log records.
    pub log_json: bool,

    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Settings::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:3000"),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5),
            auto_run_migrations: env_bool("AUTO_RUN_MIGRATIONS", true),

            jwt_secret: secret_or_dev(env::var("JWT_SECRET").ok()),
            jwt_ttl: Duration::from_secs(parse_env("JWT_TTL_SECONDS", DEFAULT_TOKEN_TTL.as_secs())),

            redis_enabled: env_bool("REDIS_ENABLED", false),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.trim().is_empty()),
            redis_key_prefix: env_or("REDIS_KEY_PREFIX", "sheetchat:prod"),
            chat_rate_limit_window: Duration::from_secs(parse_env(
                "CHAT_RATELIMIT_WINDOW_SECONDS",
                DEFAULT_CHAT_RATE_LIMIT_WINDOW.as_secs(),
            )),
            chat_rate_limit_max_hits: parse_env(
                "CHAT_RATELIMIT_MAX_HITS",
                DEFAULT_CHAT_RATE_LIMIT_MAX_HITS,
            ),

            log_json: env_bool("LOG_JSON", false),

            settings: Settings {
                cookie_secure: env_bool("COOKIE_SECURE", defaults.cookie_secure),
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
                insert_batch_size: parse_env("INSERT_BATCH_SIZE", defaults.insert_batch_size)
                    .max(1),
                default_page_size: parse_env("DEFAULT_PAGE_SIZE", defaults.default_page_size)
                    .max(1),
                max_page_size: parse_env("MAX_PAGE_SIZE", defaults.max_page_size).max(1),
                prompt_sample_rows: parse_env("PROMPT_SAMPLE_ROWS", defaults.prompt_sample_rows),
            },
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// A missing or blank secret falls back to the development one.
fn secret_or_dev(raw: Option<String>) -> String {
    raw.filter(|secret| !secret.trim().is_empty())
        .unwrap_or_else(|| DEV_JWT_SECRET.to_owned())
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => is_truthy(&value),
        Err(_) => default,
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_secret_counts_as_unset() {
        assert_eq!(secret_or_dev(None), DEV_JWT_SECRET);
        assert_eq!(secret_or_dev(Some(String::new())), DEV_JWT_SECRET);
        assert_eq!(secret_or_dev(Some("  \t\n".to_owned())), DEV_JWT_SECRET);
    }

    #[test]
    fn configured_secret_is_kept() {
        assert_eq!(secret_or_dev(Some("s3cret".to_owned())), "s3cret");
    }
}
