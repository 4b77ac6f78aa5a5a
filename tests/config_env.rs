//! Layered configuration through the process environment.
//!
//! These tests mutate `REVOCATION_CACHE__*` variables, so they run serially.

use std::env;
use std::time::Duration;

use clap::Parser;
use revocation_cache::config::{self, CliArgs, LoadError};
use serial_test::serial;

const FETCH_TIMEOUT: &str = "REVOCATION_CACHE__CACHE__FETCH_TIMEOUT_MS";
const DATABASE_TABLE: &str = "REVOCATION_CACHE__DATABASE__TABLE";
const MAX_DELAY: &str = "REVOCATION_CACHE__CACHE__MAX_NEXT_UPDATE_DELAY_SECS";

fn set(key: &str, value: &str) {
    // SAFETY: env access is serialized by `#[serial]`.
    unsafe { env::set_var(key, value) };
}

fn clear(keys: &[&str]) {
    for key in keys {
        // SAFETY: env access is serialized by `#[serial]`.
        unsafe { env::remove_var(key) };
    }
}

#[test]
#[serial]
fn environment_overrides_file_defaults() {
    set(FETCH_TIMEOUT, "2500");
    set(MAX_DELAY, "86400");

    let args = CliArgs::parse_from(["revocation-cache", "status"]);
    let settings = config::load(&args);
    clear(&[FETCH_TIMEOUT, MAX_DELAY]);

    let settings = settings.expect("valid settings");
    assert_eq!(settings.cache.fetch_timeout(), Duration::from_millis(2500));
    assert_eq!(
        settings.cache.max_next_update_delay(),
        Some(Duration::from_secs(86_400))
    );
}

#[test]
#[serial]
fn cli_beats_environment() {
    set(FETCH_TIMEOUT, "2500");

    let args = CliArgs::parse_from([
        "revocation-cache",
        "status",
        "--cache-fetch-timeout-ms",
        "900",
    ]);
    let settings = config::load(&args);
    clear(&[FETCH_TIMEOUT]);

    assert_eq!(
        settings.expect("valid settings").cache.fetch_timeout(),
        Duration::from_millis(900)
    );
}

#[test]
#[serial]
fn invalid_table_from_environment_is_rejected() {
    set(DATABASE_TABLE, "Bad-Name");

    let args = CliArgs::parse_from(["revocation-cache", "provision"]);
    let result = config::load(&args);
    clear(&[DATABASE_TABLE]);

    assert!(matches!(
        result,
        Err(LoadError::Invalid {
            key: "database.table",
            ..
        })
    ));
}
