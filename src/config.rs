use anyhow::{bail, Context, Result};

use crate::thingspeak::models::FeedCredentials;

pub const DEFAULT_DATABASE_PATH: &str = "data.db";
pub const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";

/// Reads a configuration value by key. `Config::from_env` uses the process
/// environment; tests pass a map.
type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite file, created on first start.
    pub database_path: String,
    pub thingspeak_base_url: String,
    /// `GREENHOUSE_CHANNEL_ID`/`GREENHOUSE_READ_KEY`, or the single-feed
    /// `CHANNEL_ID`/`READ_KEY` pair.
    pub greenhouse_feed: Option<FeedCredentials>,
    /// `DOOM_CHANNEL_ID`/`DOOM_READ_KEY`.
    pub doom_feed: Option<FeedCredentials>,
    /// Upper bound on records requested per feed.
    pub max_records: u32,
    pub fetch_timeout_secs: u64,
    /// Populate `time_stamp_unix` from the provider time stamp.
    pub include_unix_timestamp: bool,
    /// Log a summary of every stored row.
    pub verbose: bool,
    pub server_host: String,
    pub server_port: u16,
    /// Sync interval in seconds; `0` runs a single pass and exits.
    pub poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&env_lookup)
    }

    /// Builds and validates the configuration eagerly: a half-configured feed,
    /// an empty value or a malformed number fails here rather than on first use.
    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self> {
        let greenhouse_feed = match feed(lookup, "GREENHOUSE_CHANNEL_ID", "GREENHOUSE_READ_KEY")? {
            Some(f) => Some(f),
            None => feed(lookup, "CHANNEL_ID", "READ_KEY")?,
        };
        let doom_feed = feed(lookup, "DOOM_CHANNEL_ID", "DOOM_READ_KEY")?;

        if greenhouse_feed.is_none() && doom_feed.is_none() {
            bail!(
                "no feed configured: set GREENHOUSE_CHANNEL_ID/GREENHOUSE_READ_KEY \
                 (or CHANNEL_ID/READ_KEY) and/or DOOM_CHANNEL_ID/DOOM_READ_KEY"
            );
        }

        let max_records: u32 = optional(lookup, "MAX_RECORDS", "8000")
            .parse()
            .context("MAX_RECORDS must be a positive integer")?;
        if max_records == 0 {
            bail!("MAX_RECORDS must be a positive integer");
        }

        Ok(Self {
            database_path: optional(lookup, "DATABASE_PATH", DEFAULT_DATABASE_PATH),
            thingspeak_base_url: optional(lookup, "THINGSPEAK_BASE_URL", DEFAULT_BASE_URL),
            greenhouse_feed,
            doom_feed,
            max_records,
            fetch_timeout_secs: optional(lookup, "FETCH_TIMEOUT_SECS", "30")
                .parse()
                .context("FETCH_TIMEOUT_SECS must be a non-negative integer")?,
            include_unix_timestamp: parse_bool(
                "INCLUDE_UNIX_TIMESTAMP",
                &optional(lookup, "INCLUDE_UNIX_TIMESTAMP", "true"),
            )?,
            verbose: parse_bool("VERBOSE", &optional(lookup, "VERBOSE", "false"))?,
            server_host: optional(lookup, "SERVER_HOST", "0.0.0.0"),
            server_port: optional(lookup, "SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            poll_interval_secs: optional(lookup, "POLL_INTERVAL_SECS", "0")
                .parse()
                .context("POLL_INTERVAL_SECS must be a non-negative integer")?,
        })
    }
}

/// Database location only, for tools that read the store without syncing.
pub fn database_path_from_env() -> String {
    optional(&env_lookup, "DATABASE_PATH", DEFAULT_DATABASE_PATH)
}

/// A feed is enabled when both of its variables are set. Exactly one of the
/// pair being set is a configuration error.
fn feed(lookup: &Lookup<'_>, channel_var: &str, key_var: &str) -> Result<Option<FeedCredentials>> {
    match (non_empty(lookup, channel_var)?, non_empty(lookup, key_var)?) {
        (Some(channel_id), Some(read_key)) => Ok(Some(FeedCredentials { channel_id, read_key })),
        (None, None) => Ok(None),
        (Some(_), None) => bail!("{channel_var} is set but {key_var} is missing"),
        (None, Some(_)) => bail!("{key_var} is set but {channel_var} is missing"),
    }
}

fn non_empty(lookup: &Lookup<'_>, key: &str) -> Result<Option<String>> {
    match lookup(key) {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => bail!("env var {key} must not be empty"),
        Some(v) => Ok(Some(v.trim().to_owned())),
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => bail!("{key} must be a boolean (true/false), got: {other:?}"),
    }
}

fn optional(lookup: &Lookup<'_>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_owned())
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
