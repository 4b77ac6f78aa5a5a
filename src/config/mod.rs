//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroU32, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::cache::CacheConfig;
use crate::infra::db::validate_table_name;

pub use cli::{CliArgs, Command, GlobalOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "revocation-cache";
const ENV_PREFIX: &str = "REVOCATION_CACHE";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
pub(crate) const DEFAULT_CACHE_TABLE: &str = "cached_revocations";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
    /// Validated SQL identifier of the cache table.
    pub table: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
    table: Option<String>,
}

/// Delay settings use `0` to mean "unset".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    default_next_update_delay_secs: Option<u64>,
    max_next_update_delay_secs: Option<u64>,
    fetch_timeout_ms: Option<u64>,
    event_capacity: Option<usize>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(table) = overrides.cache_table.as_ref() {
            self.database.table = Some(table.clone());
        }
        if let Some(secs) = overrides.default_next_update_delay_seconds {
            self.cache.default_next_update_delay_secs = Some(secs);
        }
        if let Some(secs) = overrides.max_next_update_delay_seconds {
            self.cache.max_next_update_delay_secs = Some(secs);
        }
        if let Some(ms) = overrides.fetch_timeout_ms {
            self.cache.fetch_timeout_ms = Some(ms);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            cache,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    let table = database
        .table
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CACHE_TABLE.to_string());
    validate_table_name(&table).map_err(|reason| LoadError::invalid("database.table", reason))?;

    Ok(DatabaseSettings {
        url,
        max_connections,
        table,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheConfig, LoadError> {
    let defaults = CacheConfig::default();

    let default_next_update_delay_secs = match cache.default_next_update_delay_secs {
        Some(0) => None,
        Some(secs) => Some(secs),
        None => defaults.default_next_update_delay_secs,
    };
    let max_next_update_delay_secs = match cache.max_next_update_delay_secs {
        Some(0) => None,
        Some(secs) => Some(secs),
        None => defaults.max_next_update_delay_secs,
    };

    let fetch_timeout_ms = cache.fetch_timeout_ms.unwrap_or(defaults.fetch_timeout_ms);
    if fetch_timeout_ms == 0 {
        return Err(LoadError::invalid(
            "cache.fetch_timeout_ms",
            "must be greater than zero",
        ));
    }

    let event_capacity = cache.event_capacity.unwrap_or(defaults.event_capacity);
    if event_capacity == 0 {
        return Err(LoadError::invalid(
            "cache.event_capacity",
            "must be greater than zero",
        ));
    }

    Ok(CacheConfig {
        default_next_update_delay_secs,
        max_next_update_delay_secs,
        fetch_timeout_ms,
        event_capacity,
    })
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[cfg(test)]
mod tests;
