// Server configuration loaded from environment variables.
// Decision: DOORSTATE_ prefix for everything specific to this service
// Decision: Unset DATABASE_URL means dev mode with the in-memory store

use chrono::{Duration, FixedOffset};
use doorstate_core::window::{DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_EVENTS};
use doorstate_core::{HistoryWindow, SubmissionPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_DB_CONNECT_RETRIES: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable required")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the shared HMAC secret
    pub key_file: PathBuf,
    /// PostgreSQL URL, `None` for the in-memory store
    pub database_url: Option<String>,
    pub db_connect_retries: u32,
    pub bind_addr: SocketAddr,
    pub history_window: HistoryWindow,
    pub submission_policy: SubmissionPolicy,
    /// Offset used for calendar buckets and status text
    pub utc_offset: FixedOffset,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let key_file = get("DOORSTATE_KEY_FILE")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("DOORSTATE_KEY_FILE"))?;

        let max_events = parse_or(
            "DOORSTATE_HISTORY_MAX_EVENTS",
            get("DOORSTATE_HISTORY_MAX_EVENTS"),
            DEFAULT_MAX_EVENTS,
        )?;
        let max_age_days = parse_or(
            "DOORSTATE_HISTORY_MAX_AGE_DAYS",
            get("DOORSTATE_HISTORY_MAX_AGE_DAYS"),
            DEFAULT_MAX_AGE_DAYS,
        )?;
        if max_age_days < 0 {
            return Err(invalid(
                "DOORSTATE_HISTORY_MAX_AGE_DAYS",
                &max_age_days.to_string(),
                "must not be negative",
            ));
        }
        let max_age = Duration::try_days(max_age_days).ok_or_else(|| {
            invalid(
                "DOORSTATE_HISTORY_MAX_AGE_DAYS",
                &max_age_days.to_string(),
                "out of range",
            )
        })?;

        let max_clock_skew = match get("DOORSTATE_MAX_CLOCK_SKEW_SECS") {
            Some(raw) => {
                let secs: i64 = parse("DOORSTATE_MAX_CLOCK_SKEW_SECS", &raw)?;
                if secs < 0 {
                    return Err(invalid(
                        "DOORSTATE_MAX_CLOCK_SKEW_SECS",
                        &raw,
                        "must not be negative",
                    ));
                }
                Some(Duration::seconds(secs))
            }
            None => None,
        };

        // Untimed submissions carry no signed instant and can be replayed
        let allow_untimed = parse_or(
            "DOORSTATE_ALLOW_UNTIMED_SUBMISSIONS",
            get("DOORSTATE_ALLOW_UNTIMED_SUBMISSIONS"),
            false,
        )?;

        let utc_offset = match get("DOORSTATE_UTC_OFFSET") {
            Some(raw) => FixedOffset::from_str(raw.trim())
                .map_err(|e| invalid("DOORSTATE_UTC_OFFSET", &raw, &e.to_string()))?,
            None => FixedOffset::east_opt(0).ok_or_else(|| {
                invalid("DOORSTATE_UTC_OFFSET", "+00:00", "out of range")
            })?,
        };

        let bind_addr = parse(
            "DOORSTATE_BIND_ADDR",
            &get("DOORSTATE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        )?;

        // Example: CORS_ALLOWED_ORIGINS="https://door.example.com,https://status.example.com"
        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            key_file,
            database_url: get("DATABASE_URL"),
            db_connect_retries: parse_or(
                "DOORSTATE_DB_CONNECT_RETRIES",
                get("DOORSTATE_DB_CONNECT_RETRIES"),
                DEFAULT_DB_CONNECT_RETRIES,
            )?,
            bind_addr,
            history_window: HistoryWindow::new(max_events, max_age),
            submission_policy: SubmissionPolicy {
                max_clock_skew,
                allow_untimed,
            },
            utc_offset,
            api_prefix: lookup("API_PREFIX").unwrap_or_default(),
            cors_origins,
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(name, raw, &e.to_string()))
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse(name, &raw),
        None => Ok(default),
    }
}
