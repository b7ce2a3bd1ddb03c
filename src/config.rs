use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use std::path::PathBuf;
use std::time::Duration;

use crate::models::DEFAULT_COMPETITION_START_MS;

const DEFAULT_CALL_TOKEN: char = '$';
const DEFAULT_DATABASE_PATH: &str = "leek.db";
const DEFAULT_LEETCODE_URL: &str = "https://leetcode.com";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub call_token: char,
    pub database_path: PathBuf,
    pub leetcode_url: String,
    pub competition_start: DateTime<Utc>,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN")
            .context("Expected 'DISCORD_TOKEN=<token>' in .env in project root.")?;

        let call_token = match lookup("BOT_CALL_TOKEN") {
            Some(env_token) => {
                let token = env_token.chars().next().context("BOT_CALL_TOKEN is empty.")?;
                if env_token.chars().count() > 1 {
                    log::warn!("$BOT_CALL_TOKEN not a single character. Truncating to {token}");
                }
                token
            }
            None => DEFAULT_CALL_TOKEN,
        };

        let competition_start = match lookup("COMPETITION_START") {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .with_context(|| format!("COMPETITION_START must be an RFC 3339 timestamp, got {raw}"))?
                .with_timezone(&Utc),
            None => DateTime::from_timestamp_millis(DEFAULT_COMPETITION_START_MS)
                .ok_or_else(|| anyhow!("Default competition start is out of range."))?,
        };

        let request_timeout = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse().with_context(|| format!("Invalid REQUEST_TIMEOUT_SECS: {raw}"))?,
            ),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            discord_token,
            call_token,
            database_path: lookup("DATABASE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH), PathBuf::from),
            leetcode_url: lookup("LEETCODE_URL").unwrap_or_else(|| DEFAULT_LEETCODE_URL.to_string()),
            competition_start,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.call_token, '$');
        assert_eq!(config.database_path, PathBuf::from("leek.db"));
        assert_eq!(config.leetcode_url, "https://leetcode.com");
        assert_eq!(config.competition_start.timestamp_millis(), DEFAULT_COMPETITION_START_MS);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn token_is_required() {
        assert!(config(&[]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config(&[
            ("DISCORD_TOKEN", "abc"),
            ("BOT_CALL_TOKEN", "!!"),
            ("COMPETITION_START", "2025-09-01T12:00:00+02:00"),
            ("REQUEST_TIMEOUT_SECS", "3"),
            ("DATABASE_PATH", "/tmp/board.db"),
        ])
        .unwrap();

        assert_eq!(config.call_token, '!');
        assert_eq!(config.competition_start.to_rfc3339(), "2025-09-01T10:00:00+00:00");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.database_path, PathBuf::from("/tmp/board.db"));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("COMPETITION_START", "june")]).is_err());
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("REQUEST_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("DISCORD_TOKEN", "abc"), ("BOT_CALL_TOKEN", "")]).is_err());
    }
}
