//! Revocation evidence as it flows through the cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::error::DomainError;

/// Stable cache identifier for a certificate/issuer pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectKey(String);

impl SubjectKey {
    /// Wrap a key previously produced by the key derivation and read back from storage.
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which kind of authority produced the evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationKind {
    Ocsp,
    Crl,
}

impl RevocationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RevocationKind::Ocsp => "ocsp",
            RevocationKind::Crl => "crl",
        }
    }
}

impl FromStr for RevocationKind {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ocsp" => Ok(RevocationKind::Ocsp),
            "crl" => Ok(RevocationKind::Crl),
            other => Err(DomainError::invariant(format!(
                "unknown revocation kind `{other}`"
            ))),
        }
    }
}

/// CRLReason values from RFC 5280 §5.3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RevocationReason::Unspecified => "unspecified",
            RevocationReason::KeyCompromise => "key_compromise",
            RevocationReason::CaCompromise => "ca_compromise",
            RevocationReason::AffiliationChanged => "affiliation_changed",
            RevocationReason::Superseded => "superseded",
            RevocationReason::CessationOfOperation => "cessation_of_operation",
            RevocationReason::CertificateHold => "certificate_hold",
            RevocationReason::RemoveFromCrl => "remove_from_crl",
            RevocationReason::PrivilegeWithdrawn => "privilege_withdrawn",
            RevocationReason::AaCompromise => "aa_compromise",
        }
    }

    /// Map the numeric CRLReason code a fetcher decodes from an OCSP
    /// `revocationReason` or a CRL entry extension; 7 is unassigned.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RevocationReason::Unspecified),
            1 => Some(RevocationReason::KeyCompromise),
            2 => Some(RevocationReason::CaCompromise),
            3 => Some(RevocationReason::AffiliationChanged),
            4 => Some(RevocationReason::Superseded),
            5 => Some(RevocationReason::CessationOfOperation),
            6 => Some(RevocationReason::CertificateHold),
            8 => Some(RevocationReason::RemoveFromCrl),
            9 => Some(RevocationReason::PrivilegeWithdrawn),
            10 => Some(RevocationReason::AaCompromise),
            _ => None,
        }
    }
}

impl FromStr for RevocationReason {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let reason = match value {
            "unspecified" => RevocationReason::Unspecified,
            "key_compromise" => RevocationReason::KeyCompromise,
            "ca_compromise" => RevocationReason::CaCompromise,
            "affiliation_changed" => RevocationReason::AffiliationChanged,
            "superseded" => RevocationReason::Superseded,
            "cessation_of_operation" => RevocationReason::CessationOfOperation,
            "certificate_hold" => RevocationReason::CertificateHold,
            "remove_from_crl" => RevocationReason::RemoveFromCrl,
            "privilege_withdrawn" => RevocationReason::PrivilegeWithdrawn,
            "aa_compromise" => RevocationReason::AaCompromise,
            other => {
                return Err(DomainError::invariant(format!(
                    "unknown revocation reason `{other}`"
                )));
            }
        };
        Ok(reason)
    }
}

/// Status asserted by the authority.
///
/// Revocation details only exist on the `Revoked` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationStatus {
    Good,
    Revoked {
        revoked_at: OffsetDateTime,
        reason: Option<RevocationReason>,
    },
    Unknown,
}

impl RevocationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RevocationStatus::Good => "good",
            RevocationStatus::Revoked { .. } => "revoked",
            RevocationStatus::Unknown => "unknown",
        }
    }

    pub fn is_revoked(&self) -> bool {
        matches!(self, RevocationStatus::Revoked { .. })
    }

    pub fn revocation_date(&self) -> Option<OffsetDateTime> {
        match self {
            RevocationStatus::Revoked { revoked_at, .. } => Some(*revoked_at),
            _ => None,
        }
    }

    pub fn revocation_reason(&self) -> Option<RevocationReason> {
        match self {
            RevocationStatus::Revoked { reason, .. } => *reason,
            _ => None,
        }
    }

    /// Rebuild a status from its flattened storage columns.
    pub fn from_parts(
        label: &str,
        revoked_at: Option<OffsetDateTime>,
        reason: Option<&str>,
    ) -> Result<Self, DomainError> {
        match label {
            "good" => Ok(RevocationStatus::Good),
            "unknown" => Ok(RevocationStatus::Unknown),
            "revoked" => {
                let revoked_at = revoked_at.ok_or_else(|| {
                    DomainError::invariant("revoked status stored without a revocation date")
                })?;
                let reason = reason.map(RevocationReason::from_str).transpose()?;
                Ok(RevocationStatus::Revoked { revoked_at, reason })
            }
            other => Err(DomainError::invariant(format!(
                "unknown revocation status `{other}`"
            ))),
        }
    }
}

/// Authority-produced evidence, as returned by a remote fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationEvidence {
    pub kind: RevocationKind,
    pub status: RevocationStatus,
    pub this_update: OffsetDateTime,
    pub next_update: Option<OffsetDateTime>,
    pub produced_at: OffsetDateTime,
    pub source_url: Option<String>,
    /// Original signed response, returned verbatim.
    pub encoded: Vec<u8>,
}

/// Evidence bound to the cache key it is stored under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationAnswer {
    pub subject_key: SubjectKey,
    pub evidence: RevocationEvidence,
}

impl RevocationAnswer {
    /// Bind `evidence` to `subject_key`.
    ///
    /// Timestamps are truncated to whole microseconds, the precision the
    /// store keeps, so a freshly fetched answer equals its stored copy.
    pub fn new(subject_key: SubjectKey, mut evidence: RevocationEvidence) -> Self {
        evidence.this_update = to_micros(evidence.this_update);
        evidence.next_update = evidence.next_update.map(to_micros);
        evidence.produced_at = to_micros(evidence.produced_at);
        if let RevocationStatus::Revoked { revoked_at, .. } = &mut evidence.status {
            *revoked_at = to_micros(*revoked_at);
        }

        Self {
            subject_key,
            evidence,
        }
    }

    pub fn status(&self) -> &RevocationStatus {
        &self.evidence.status
    }

    pub fn this_update(&self) -> OffsetDateTime {
        self.evidence.this_update
    }

    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.evidence.next_update
    }

    pub fn encoded(&self) -> &[u8] {
        &self.evidence.encoded
    }
}

fn to_micros(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_microsecond(at.microsecond()).unwrap_or(at)
}

/// Retrieval path of a single lookup. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationOrigin {
    /// Served from the store without contacting the authority.
    Cached,
    /// Fetched from the authority during this call.
    External,
}

impl RevocationOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            RevocationOrigin::Cached => "cached",
            RevocationOrigin::External => "external",
        }
    }
}

/// Answer plus the origin tag assigned for this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedAnswer {
    pub answer: RevocationAnswer,
    pub origin: RevocationOrigin,
}

impl TaggedAnswer {
    pub fn cached(answer: RevocationAnswer) -> Self {
        Self {
            answer,
            origin: RevocationOrigin::Cached,
        }
    }

    pub fn external(answer: RevocationAnswer) -> Self {
        Self {
            answer,
            origin: RevocationOrigin::External,
        }
    }

    /// Drop the origin tag for consumers that only embed the evidence.
    pub fn into_answer(self) -> RevocationAnswer {
        self.answer
    }
}
