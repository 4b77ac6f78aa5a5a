use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::metric_names::{
    METRIC_FETCH_FAILED_TOTAL, METRIC_FETCH_MS, METRIC_FETCH_TOTAL, METRIC_HIT_TOTAL,
    METRIC_MISS_TOTAL, METRIC_STALE_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for the cache metrics with the installed recorder.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_HIT_TOTAL,
            Unit::Count,
            "Lookups served from a fresh stored answer."
        );
        describe_counter!(
            METRIC_MISS_TOTAL,
            Unit::Count,
            "Lookups that found no stored answer."
        );
        describe_counter!(
            METRIC_STALE_TOTAL,
            Unit::Count,
            "Lookups that found a stored answer past its effective expiry."
        );
        describe_counter!(
            METRIC_FETCH_TOTAL,
            Unit::Count,
            "Remote revocation fetches attempted."
        );
        describe_counter!(
            METRIC_FETCH_FAILED_TOTAL,
            Unit::Count,
            "Remote revocation fetches that failed or timed out."
        );
        describe_histogram!(
            METRIC_FETCH_MS,
            Unit::Milliseconds,
            "Remote revocation fetch latency in milliseconds."
        );
    });
}
