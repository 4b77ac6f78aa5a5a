use std::{process, sync::Arc};

use revocation_cache::{
    cache::{CacheError, RevocationCache},
    config::{self, Command},
    infra::{db::PostgresRevocationStore, error::InfraError, telemetry},
};
use thiserror::Error;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args.command.unwrap_or(Command::Status);

    telemetry::init(&settings.logging)?;

    let store = init_store(&settings).await?;
    let cache = RevocationCache::new(Arc::new(store.clone()), &settings.cache);

    match command {
        Command::Provision => {
            cache.provision().await?;
            info!(table = store.table(), "Cache table created");
            Ok(())
        }
        Command::Deprovision => {
            cache.deprovision().await?;
            info!(table = store.table(), "Cache table dropped");
            Ok(())
        }
        Command::Status => run_status(&store, &cache).await,
    }
}

async fn init_store(settings: &config::Settings) -> Result<PostgresRevocationStore, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    let pool =
        PostgresRevocationStore::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(InfraError::from)?;

    Ok(PostgresRevocationStore::new(
        pool,
        &settings.database.table,
    )?)
}

async fn run_status(
    store: &PostgresRevocationStore,
    cache: &RevocationCache,
) -> Result<(), AppError> {
    store.health_check().await.map_err(InfraError::from)?;
    let provisioned = cache.is_provisioned().await?;

    println!("table:                     {}", store.table());
    println!("provisioned:               {provisioned}");
    println!(
        "default next-update delay: {}",
        describe_delay(cache.default_next_update_delay())
    );
    println!(
        "max next-update delay:     {}",
        describe_delay(cache.max_next_update_delay())
    );
    println!(
        "fetch timeout:             {}ms",
        cache.fetch_timeout().as_millis()
    );

    Ok(())
}

fn describe_delay(delay: Option<std::time::Duration>) -> String {
    delay.map_or_else(|| "unset".to_string(), |d| format!("{}s", d.as_secs()))
}
