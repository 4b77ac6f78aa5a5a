use crate::cache::StoreError;

const DUPLICATE_TABLE: &str = "42P07";
const UNDEFINED_TABLE: &str = "42P01";
const UNIQUE_VIOLATION: &str = "23505";
const QUERY_CANCELED: &str = "57014";

/// Concurrent `CREATE TABLE` races surface as a unique violation on the catalog.
const PG_TYPE_NAME_INDEX: &str = "pg_type_typname_nsp_index";

/// Map a driver error from a schema operation onto [`StoreError`].
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(DUPLICATE_TABLE) => StoreError::AlreadyProvisioned,
            Some(UNIQUE_VIOLATION) if db.constraint() == Some(PG_TYPE_NAME_INDEX) => {
                StoreError::AlreadyProvisioned
            }
            Some(UNDEFINED_TABLE) => StoreError::NotProvisioned,
            Some(QUERY_CANCELED) => StoreError::unavailable("statement timed out"),
            _ => StoreError::unavailable(db.message()),
        },
        other => StoreError::unavailable(other),
    }
}

/// Map a driver error from a read or write of cache rows.
///
/// A missing table is a storage failure here, not a lifecycle error.
pub fn map_sqlx_data_error(err: sqlx::Error) -> StoreError {
    match map_sqlx_error(err) {
        StoreError::NotProvisioned => StoreError::unavailable("cache table is not provisioned"),
        other => other,
    }
}
