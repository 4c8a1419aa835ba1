//! Configuration management for the client.

use crate::ids::{TimestampIds, UuidIds};
use shelf_engine::{IdGenerator, ValidationPolicy, DEFAULT_PAGE_SIZE, DEFAULT_SEED_LIMIT};
use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Placeholder API used when `SHELF_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "https://jsonplaceholder.typicode.com/posts";

/// Slot name used when `SHELF_STORE_KEY` is unset.
pub const DEFAULT_STORE_KEY: &str = "books";

/// How locally created books get their provisional ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdPolicy {
    /// Random v4 UUIDs
    #[default]
    Uuid,
    /// Millisecond timestamps
    Timestamp,
}

impl IdPolicy {
    pub fn generator(self) -> Box<dyn IdGenerator> {
        match self {
            IdPolicy::Uuid => Box::new(UuidIds),
            IdPolicy::Timestamp => Box::new(TimestampIds::default()),
        }
    }
}

impl FromStr for IdPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uuid" => Ok(IdPolicy::Uuid),
            "timestamp" => Ok(IdPolicy::Timestamp),
            other => Err(ConfigError::InvalidIdPolicy(other.to_string())),
        }
    }
}

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote collection
    pub api_url: String,
    /// Directory holding the persisted slot
    pub data_dir: PathBuf,
    /// Name of the persisted slot
    pub store_key: String,
    /// Seed items kept on bootstrap
    pub seed_limit: usize,
    /// Books per page
    pub page_size: usize,
    /// Field rules for create and update
    pub policy: ValidationPolicy,
    pub id_policy: IdPolicy,
    /// Per-request timeout for the remote mirror; none by default
    pub http_timeout: Option<Duration>,
    /// Mock server host address
    pub host: String,
    /// Mock server port
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from(".shelf"),
            store_key: DEFAULT_STORE_KEY.to_string(),
            seed_limit: DEFAULT_SEED_LIMIT,
            page_size: DEFAULT_PAGE_SIZE,
            policy: ValidationPolicy::default(),
            id_policy: IdPolicy::default(),
            http_timeout: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let year_min = parse_var(&lookup, "SHELF_YEAR_MIN", defaults.policy.year_min)?;
        let year_max = parse_var(&lookup, "SHELF_YEAR_MAX", defaults.policy.year_max)?;
        if year_min > year_max {
            return Err(ConfigError::InvalidYearRange {
                min: year_min,
                max: year_max,
            });
        }

        let author_required = parse_var(
            &lookup,
            "SHELF_AUTHOR_REQUIRED",
            defaults.policy.author_required,
        )?;
        let mut policy = defaults.policy.with_year_range(year_min, year_max);
        policy.author_required = author_required;

        let id_policy = match lookup("SHELF_ID_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.id_policy,
        };

        let http_timeout = match lookup("SHELF_HTTP_TIMEOUT_SECS") {
            Some(value) => Some(Duration::from_secs(parse_value(
                "SHELF_HTTP_TIMEOUT_SECS",
                &value,
            )?)),
            None => None,
        };

        Ok(Self {
            api_url: lookup("SHELF_API_URL").unwrap_or(defaults.api_url),
            data_dir: lookup("SHELF_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            store_key: lookup("SHELF_STORE_KEY").unwrap_or(defaults.store_key),
            seed_limit: parse_var(&lookup, "SHELF_SEED_LIMIT", defaults.seed_limit)?,
            page_size: parse_var(&lookup, "SHELF_PAGE_SIZE", defaults.page_size)?,
            policy,
            id_policy,
            http_timeout,
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => parse_value(name, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {name} value: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid year range: {min} > {max}")]
    InvalidYearRange { min: i32, max: i32 },

    #[error("Invalid SHELF_ID_POLICY value: {0:?} (expected uuid or timestamp)")]
    InvalidIdPolicy(String),
}
