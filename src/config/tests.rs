use std::time::Duration;

use super::*;

#[test]
fn defaults_resolve() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.database.url, None);
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.database.table, DEFAULT_CACHE_TABLE);
    assert_eq!(settings.cache, CacheConfig::default());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("info".to_string());
    raw.cache.fetch_timeout_ms = Some(5_000);

    let overrides = GlobalOverrides {
        log_level: Some("debug".to_string()),
        fetch_timeout_ms: Some(750),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.fetch_timeout(), Duration::from_millis(750));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_delays_mean_unset() {
    let mut raw = RawSettings::default();
    raw.cache.default_next_update_delay_secs = Some(0);
    raw.cache.max_next_update_delay_secs = Some(0);

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.cache.default_next_update_delay(), None);
    assert_eq!(settings.cache.max_next_update_delay(), None);
}

#[test]
fn max_delay_can_be_set() {
    let mut raw = RawSettings::default();
    raw.cache.max_next_update_delay_secs = Some(86_400);

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.cache.max_next_update_delay(),
        Some(Duration::from_secs(86_400))
    );
}

#[test]
fn zero_fetch_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.fetch_timeout_ms = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.fetch_timeout_ms",
            ..
        }
    ));
}

#[test]
fn invalid_table_name_is_rejected() {
    let mut raw = RawSettings::default();
    raw.database.table = Some("revocations; DROP TABLE users".to_string());

    let err = Settings::from_raw(raw).expect_err("unsafe identifier");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "database.table",
            ..
        }
    ));
}

#[test]
fn blank_database_url_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url, None);
}

#[test]
fn parse_provision_with_global_overrides() {
    let args = CliArgs::parse_from([
        "revocation-cache",
        "provision",
        "--database-url",
        "postgres://example",
        "--cache-table",
        "ocsp_answers",
    ]);

    assert_eq!(args.command, Some(Command::Provision));
    assert_eq!(
        args.overrides.database_url.as_deref(),
        Some("postgres://example")
    );
    assert_eq!(args.overrides.cache_table.as_deref(), Some("ocsp_answers"));
}

#[test]
fn parse_status_without_overrides() {
    let args = CliArgs::parse_from(["revocation-cache", "status"]);

    assert_eq!(args.command, Some(Command::Status));
    assert!(args.overrides.database_url.is_none());
    assert!(args.config_file.is_none());
}

#[test]
fn parse_deprovision_delay_overrides() {
    let args = CliArgs::parse_from([
        "revocation-cache",
        "--cache-default-next-update-delay-seconds",
        "120",
        "deprovision",
        "--cache-max-next-update-delay-seconds",
        "3600",
    ]);

    assert_eq!(args.command, Some(Command::Deprovision));
    assert_eq!(args.overrides.default_next_update_delay_seconds, Some(120));
    assert_eq!(args.overrides.max_next_update_delay_seconds, Some(3600));
}
