// crates/geotiles-core/src/config.rs

//! Pipeline configuration, built once at startup and passed by reference.

use crate::error::{GeoTilesError, Result};
use crate::guard::{DestructiveGuard, DESTRUCTIVE_FLAG};
use crate::source::SourceScale;
use crate::sync::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Connection details for the publish stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub db_connection: String,
    pub storage_url: String,
    pub storage_credentials: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tried before the built-in mirrors when set.
    pub source_url: Option<String>,
    pub source_scale: SourceScale,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub guard: DestructiveGuard,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub chunk_size: usize,
    pub db_connection: Option<String>,
    pub storage_url: Option<String>,
    pub storage_credentials: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: None,
            source_scale: SourceScale::Coarse,
            data_dir: PathBuf::from("data"),
            out_dir: PathBuf::from("out"),
            guard: DestructiveGuard::default(),
            concurrency: 6,
            retry: RetryPolicy::default(),
            chunk_size: 200,
            db_connection: None,
            storage_url: None,
            storage_credentials: None,
        }
    }
}

impl Config {
    /// Reads every setting from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (environment, map, ...).
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let source_scale = match get("SOURCE_SCALE") {
            Some(v) => SourceScale::from_str(&v).map_err(GeoTilesError::Validation)?,
            None => defaults.source_scale,
        };

        let retry = RetryPolicy {
            max_attempts: parse_or(get("SYNC_RETRIES"), "SYNC_RETRIES", defaults.retry.max_attempts)?,
            base_delay: Duration::from_millis(parse_or(
                get("SYNC_BASE_DELAY_MS"),
                "SYNC_BASE_DELAY_MS",
                defaults.retry.base_delay.as_millis() as u64,
            )?),
            attempt_timeout: match get("SYNC_ATTEMPT_TIMEOUT_SECS") {
                Some(v) => match parse::<u64>(&v, "SYNC_ATTEMPT_TIMEOUT_SECS")? {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                },
                None => defaults.retry.attempt_timeout,
            },
        };

        Ok(Self {
            source_url: get("SOURCE_URL"),
            source_scale,
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            out_dir: get("OUT_DIR").map(PathBuf::from).unwrap_or(defaults.out_dir),
            guard: DestructiveGuard::from_flag(lookup(DESTRUCTIVE_FLAG).as_deref()),
            concurrency: parse_or(get("SYNC_CONCURRENCY"), "SYNC_CONCURRENCY", defaults.concurrency)?,
            retry,
            chunk_size: parse_or(get("UPSERT_CHUNK_SIZE"), "UPSERT_CHUNK_SIZE", defaults.chunk_size)?,
            db_connection: get("DB_CONNECTION"),
            storage_url: get("STORAGE_URL"),
            storage_credentials: get("STORAGE_CREDENTIALS"),
        })
    }

    /// The connection settings `publish`/`reseed` need, or a validation
    /// error naming the first missing one.
    pub fn remote(&self) -> Result<RemoteConfig> {
        let need = |v: &Option<String>, key: &str| {
            v.clone()
                .ok_or_else(|| GeoTilesError::Validation(format!("{key} is not set")))
        };
        Ok(RemoteConfig {
            db_connection: need(&self.db_connection, "DB_CONNECTION")?,
            storage_url: need(&self.storage_url, "STORAGE_URL")?,
            storage_credentials: need(&self.storage_credentials, "STORAGE_CREDENTIALS")?,
        })
    }
}

fn parse<T: FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| GeoTilesError::Validation(format!("{key}: cannot parse `{value}`")))
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    match value {
        Some(v) => parse(&v, key),
        None => Ok(default),
    }
}
