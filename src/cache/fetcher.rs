//! Remote revocation source seam.
//!
//! Implementations speak the actual OCSP or CRL wire protocol. The cache only
//! needs an answer or a reason there is none.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::certificate::CertificateToken;
use crate::domain::revocation::RevocationEvidence;

/// Why a remote authority produced no answer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("revocation source unavailable: {0}")]
    Unavailable(String),
    #[error("revocation source timed out after {0:?}")]
    TimedOut(Duration),
}

impl FetchError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

/// Fetches fresh revocation evidence from an OCSP responder or CRL endpoint.
///
/// Retries, if any, happen inside the implementation before it reports
/// [`FetchError::Unavailable`]. `timeout` is the budget the cache will wait;
/// the cache also enforces it, so an implementation that overruns is cut off.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch(
        &self,
        certificate: &CertificateToken,
        issuer: &CertificateToken,
        timeout: Duration,
    ) -> Result<RevocationEvidence, FetchError>;
}
