//! Durable revocation evidence cache.
//!
//! See [`cache::RevocationCache`] for the lookup entry point and
//! [`infra::db::PostgresRevocationStore`] for the Postgres backend.

pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
