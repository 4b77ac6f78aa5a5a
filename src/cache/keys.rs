//! Cache key derivation.
//!
//! Keys follow the shape of an OCSP CertID: the issuer's name and key pin the
//! authority, the serial number picks the certificate. Every component is
//! length-prefixed before hashing so distinct inputs never concatenate to the
//! same byte string.

use sha2::{Digest, Sha256};

use crate::domain::certificate::CertificateToken;
use crate::domain::revocation::SubjectKey;

/// Derive the stable cache key for a certificate/issuer pair.
///
/// Output is 64 lowercase hex characters.
pub fn derive_subject_key(
    certificate: &CertificateToken,
    issuer: &CertificateToken,
) -> SubjectKey {
    let mut hasher = Sha256::new();
    push_component(&mut hasher, &issuer.subject_name);
    push_component(&mut hasher, &issuer.public_key);
    push_component(&mut hasher, &certificate.serial_number);
    SubjectKey::from_stored(hex::encode(hasher.finalize()))
}

fn push_component(hasher: &mut Sha256, bytes: &[u8]) {
    // Components are DER fragments; anything past u32::MAX is not a certificate.
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}
