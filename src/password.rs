//! Credential digests and verification.
//!
//! Passwords are stored as hex-encoded SHA-256 digests; the plaintext never
//! leaves the login/registration handlers. Equality against the stored
//! digest is the only operation ever performed on it, and it is always a
//! constant-time comparison.
//!
//! Login failures are typed internally ([`CredentialError`]) so they can be
//! logged distinctly, but the HTTP layer collapses both variants into one
//! generic invalid-credentials response to avoid username enumeration.

use sha2::{Digest, Sha256};

use crate::crypto::constant_time_str_eq;

/// Why a login attempt failed. Never surfaced to clients as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    /// No account with the presented identifier.
    #[error("unknown identifier")]
    IdentityNotFound,
    /// Account exists but the supplied secret does not match.
    #[error("credential mismatch")]
    CredentialMismatch,
}

/// Hashes a plaintext secret into its stored digest form.
///
/// Deterministic: the same input always yields the same digest, so
/// `verify_password(s, hash_password(s))` holds for every input.
pub fn hash_password(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a supplied secret against a stored digest in constant time.
pub fn verify_password(supplied: &str, stored_digest: &str) -> bool {
    constant_time_str_eq(&hash_password(supplied), stored_digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_password("correct horse"), hash_password("correct horse"));
    }

    #[test]
    fn verify_accepts_original_secret() {
        let digest = hash_password("hunter2hunter2");
        assert!(verify_password("hunter2hunter2", &digest));
    }

    #[test]
    fn verify_rejects_any_other_secret() {
        let digest = hash_password("hunter2hunter2");
        assert!(!verify_password("hunter2hunter2x", &digest));
        assert!(!verify_password("", &digest));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = hash_password("abc");
        assert_eq!(digest.len(), 64);
        // Known SHA-256("abc")
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_never_contains_plaintext() {
        let digest = hash_password("plaintextsecret");
        assert!(!digest.contains("plaintext"));
    }
}
