use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use time::OffsetDateTime;

use crate::cache::{RevocationStore, StoreError};
use crate::domain::error::DomainError;
use crate::domain::revocation::{
    RevocationAnswer, RevocationEvidence, RevocationKind, RevocationStatus, SubjectKey,
};
use crate::infra::error::InfraError;

use super::{map_sqlx_data_error, map_sqlx_error, validate_table_name};

const COLUMNS: &str = "key, kind, status, this_update, next_update, produced_at, \
    revocation_date, revocation_reason, source_url, encoded";

#[derive(sqlx::FromRow)]
struct CachedRevocationRow {
    key: String,
    kind: String,
    status: String,
    this_update: OffsetDateTime,
    next_update: Option<OffsetDateTime>,
    produced_at: OffsetDateTime,
    revocation_date: Option<OffsetDateTime>,
    revocation_reason: Option<String>,
    source_url: Option<String>,
    encoded: Vec<u8>,
}

impl TryFrom<CachedRevocationRow> for RevocationAnswer {
    type Error = DomainError;

    fn try_from(row: CachedRevocationRow) -> Result<Self, Self::Error> {
        let kind: RevocationKind = row.kind.parse()?;
        let status = RevocationStatus::from_parts(
            &row.status,
            row.revocation_date,
            row.revocation_reason.as_deref(),
        )?;

        Ok(RevocationAnswer::new(
            SubjectKey::from_stored(row.key),
            RevocationEvidence {
                kind,
                status,
                this_update: row.this_update,
                next_update: row.next_update,
                produced_at: row.produced_at,
                source_url: row.source_url,
                encoded: row.encoded,
            },
        ))
    }
}

/// Statements rendered once for the configured table.
#[derive(Debug)]
struct Statements {
    create: String,
    drop: String,
    select: String,
    upsert: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        Self {
            create: format!(
                "CREATE TABLE {table} (
                    key TEXT PRIMARY KEY,
                    kind TEXT NOT NULL,
                    status TEXT NOT NULL,
                    this_update TIMESTAMPTZ NOT NULL,
                    next_update TIMESTAMPTZ NULL,
                    produced_at TIMESTAMPTZ NOT NULL,
                    revocation_date TIMESTAMPTZ NULL,
                    revocation_reason TEXT NULL,
                    source_url TEXT NULL,
                    encoded BYTEA NOT NULL
                )"
            ),
            drop: format!("DROP TABLE {table}"),
            select: format!("SELECT {COLUMNS} FROM {table} WHERE key = $1"),
            upsert: format!(
                "INSERT INTO {table} ({COLUMNS})
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (key) DO UPDATE
                 SET kind = EXCLUDED.kind,
                     status = EXCLUDED.status,
                     this_update = EXCLUDED.this_update,
                     next_update = EXCLUDED.next_update,
                     produced_at = EXCLUDED.produced_at,
                     revocation_date = EXCLUDED.revocation_date,
                     revocation_reason = EXCLUDED.revocation_reason,
                     source_url = EXCLUDED.source_url,
                     encoded = EXCLUDED.encoded"
            ),
        }
    }
}

/// Revocation answers in a single Postgres table, one row per subject key.
#[derive(Clone)]
pub struct PostgresRevocationStore {
    pool: Arc<PgPool>,
    table: Arc<str>,
    statements: Arc<Statements>,
}

impl PostgresRevocationStore {
    pub fn new(pool: PgPool, table: &str) -> Result<Self, InfraError> {
        validate_table_name(table).map_err(InfraError::configuration)?;

        Ok(Self {
            pool: Arc::new(pool),
            table: Arc::from(table),
            statements: Arc::new(Statements::for_table(table)),
        })
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1")
            .execute(self.pool())
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl RevocationStore for PostgresRevocationStore {
    async fn exists(&self) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1
                FROM information_schema.tables
                WHERE table_schema = current_schema()
                  AND table_name = $1
            )",
        )
        .bind(self.table())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_data_error)
    }

    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(&self.statements.create)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), StoreError> {
        sqlx::query(&self.statements.drop)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find(&self, key: &SubjectKey) -> Result<Option<RevocationAnswer>, StoreError> {
        let row = sqlx::query_as::<_, CachedRevocationRow>(&self.statements.select)
            .bind(key.as_str())
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_data_error)?;

        row.map(RevocationAnswer::try_from)
            .transpose()
            .map_err(|err| StoreError::unavailable(format!("corrupt cache row: {err}")))
    }

    async fn upsert(&self, key: &SubjectKey, answer: &RevocationAnswer) -> Result<(), StoreError> {
        let evidence = &answer.evidence;
        let status = &evidence.status;

        sqlx::query(&self.statements.upsert)
            .bind(key.as_str())
            .bind(evidence.kind.as_str())
            .bind(status.label())
            .bind(evidence.this_update)
            .bind(evidence.next_update)
            .bind(evidence.produced_at)
            .bind(status.revocation_date())
            .bind(status.revocation_reason().map(|reason| reason.as_str()))
            .bind(evidence.source_url.as_deref())
            .bind(evidence.encoded.as_slice())
            .execute(self.pool())
            .await
            .map_err(map_sqlx_data_error)?;

        Ok(())
    }
}
