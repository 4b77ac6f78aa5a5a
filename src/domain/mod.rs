//! Domain layer types and invariants.

pub mod certificate;
pub mod error;
pub mod revocation;
