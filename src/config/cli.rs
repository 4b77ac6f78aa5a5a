use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the revocation cache admin binary.
#[derive(Debug, Parser)]
#[command(
    name = "revocation-cache",
    version,
    about = "Revocation evidence cache administration"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "REVOCATION_CACHE_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Create the cache table. Fails if it already exists.
    Provision,
    /// Drop the cache table and every cached answer. Fails if it is absent.
    Deprovision,
    /// Report whether the cache table exists and the active freshness settings.
    Status,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT", global = true)]
    pub database_max_connections: Option<u32>,

    /// Override the cache table name.
    #[arg(long = "cache-table", value_name = "NAME", global = true)]
    pub cache_table: Option<String>,

    /// Override the lifetime of answers without a next update time.
    #[arg(
        long = "cache-default-next-update-delay-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub default_next_update_delay_seconds: Option<u64>,

    /// Override the ceiling on any answer's lifetime.
    #[arg(
        long = "cache-max-next-update-delay-seconds",
        value_name = "SECONDS",
        global = true
    )]
    pub max_next_update_delay_seconds: Option<u64>,

    /// Override the remote fetch timeout.
    #[arg(long = "cache-fetch-timeout-ms", value_name = "MILLIS", global = true)]
    pub fetch_timeout_ms: Option<u64>,
}
