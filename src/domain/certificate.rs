//! Certificate data contract consumed from the parsing collaborator.
//!
//! The cache never decodes X.509 structures. Callers hand over the handful of
//! already-extracted fields needed to identify a certificate/issuer pair.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Identifying fields of a parsed certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CertificateToken {
    /// Serial number as big-endian bytes.
    pub serial_number: Vec<u8>,
    /// DER-encoded subject distinguished name.
    pub subject_name: Vec<u8>,
    /// DER-encoded issuer distinguished name.
    pub issuer_name: Vec<u8>,
    /// DER-encoded SubjectPublicKeyInfo (or raw key bytes).
    pub public_key: Vec<u8>,
}

impl CertificateToken {
    pub fn new(
        serial_number: impl Into<Vec<u8>>,
        subject_name: impl Into<Vec<u8>>,
        issuer_name: impl Into<Vec<u8>>,
        public_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            subject_name: subject_name.into(),
            issuer_name: issuer_name.into(),
            public_key: public_key.into(),
        }
    }

    /// Serial number rendered as lowercase hex, for logs.
    pub fn serial_hex(&self) -> String {
        hex::encode(&self.serial_number)
    }

    /// Checks the fields needed to act as the subject of a revocation lookup.
    pub fn validate_as_subject(&self) -> Result<(), DomainError> {
        if self.serial_number.is_empty() {
            return Err(DomainError::validation(
                "certificate serial number must not be empty",
            ));
        }
        Ok(())
    }

    /// Checks the fields needed to act as the issuer in a revocation lookup.
    pub fn validate_as_issuer(&self) -> Result<(), DomainError> {
        if self.subject_name.is_empty() {
            return Err(DomainError::validation(
                "issuer subject name must not be empty",
            ));
        }
        if self.public_key.is_empty() {
            return Err(DomainError::validation(
                "issuer public key must not be empty",
            ));
        }
        Ok(())
    }
}
