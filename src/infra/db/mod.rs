//! Postgres-backed revocation store.

mod revocations;
mod util;

pub use revocations::PostgresRevocationStore;
pub use util::{map_sqlx_data_error, map_sqlx_error};

/// Postgres truncates identifiers beyond this length.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Accept only plain lowercase identifiers so the table name can be
/// interpolated into statements without quoting.
pub fn validate_table_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("table name must not be empty".to_string());
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(format!(
            "table name must be at most {MAX_IDENTIFIER_LEN} bytes"
        ));
    }

    let mut chars = name.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    if !leading_ok || !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
        return Err(format!(
            "`{name}` is not a valid identifier (expected [a-z_][a-z0-9_]*)"
        ));
    }

    Ok(())
}
