//! Bearer token issuance and verification.
//!
//! Tokens are the compact three-segment form `header.payload.signature`:
//! each segment is base64url without padding, the signature is an
//! HMAC-SHA256 over the first two segments keyed by the server secret.
//! A token is self-contained — validity is solely signature match plus
//! expiry; there is no revocation list and no server-side session state.
//!
//! Both [`issue`] and [`verify`] are pure functions of their arguments.
//! The clock is passed in as unix seconds so callers (and tests) control
//! time; [`TokenSigner`] wraps them with the system clock for handlers.
//!
//! # Canonical encoding
//!
//! The header and payload are serialized with `serde_json` from structs
//! with a fixed field order, which yields a compact, stable byte string.
//! Signing always happens over the *presented* segments, never over a
//! re-encoding, so encoding ambiguity cannot break signature
//! reproducibility.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::crypto::constant_time_str_eq;

type HmacSha256 = Hmac<Sha256>;

/// Token header. Constant for every token this crate issues.
#[derive(Debug, Clone, Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: Header = Header {
    alg: "HS256",
    typ: "JWT",
};

/// Identity claims embedded in a token payload.
///
/// Field order is the canonical serialization order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (user id).
    pub sub: String,
    /// Subject display name (username).
    pub name: String,
    /// Expiry as unix seconds. Strictly-after comparison: a token is
    /// still valid at exactly `exp`.
    pub exp: i64,
}

/// Verification outcome for a presented token.
///
/// All variants are ordinary rejection outcomes, not faults; the HTTP
/// layer decides how each maps to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    /// Structurally invalid: wrong segment count or undecodable payload.
    #[error("malformed token")]
    Malformed,
    /// Signature does not match (tampering, forgery, or wrong secret).
    #[error("bad token signature")]
    BadSignature,
    /// Signature is valid but the expiry has passed.
    #[error("token expired")]
    Expired,
}

/// Computes the base64url-encoded HMAC-SHA256 of `data` under `secret`.
fn sign(data: &[u8], secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(data);
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Issues a signed token for `claims`.
///
/// Pure function of the claims and secret; the expiry inside `claims` is
/// the caller's responsibility (see [`issue_at`]).
pub fn issue(claims: &Claims, secret: &[u8]) -> String {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&HEADER).expect("header serializes"));
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).expect("claims serialize"));
    let signing_input = format!("{header}.{payload}");
    let signature = sign(signing_input.as_bytes(), secret);
    format!("{signing_input}.{signature}")
}

/// Issues a token for an identity expiring `ttl_secs` after `now`.
pub fn issue_at(id: &str, name: &str, ttl_secs: i64, now: i64, secret: &[u8]) -> String {
    let claims = Claims {
        sub: id.to_owned(),
        name: name.to_owned(),
        exp: now + ttl_secs,
    };
    issue(&claims, secret)
}

/// Verifies a presented token at time `now` (unix seconds).
///
/// Single transition: Presented -> Accepted(claims) | Rejected(reason).
///
/// 1. Exactly three `'.'`-separated segments, else [`VerifyError::Malformed`].
/// 2. Recompute the signature over the first two segments as presented and
///    compare to the third in constant time, else [`VerifyError::BadSignature`].
///    The comparison is over the encoded form, so any mutation of the
///    signature segment fails even if it no longer decodes.
/// 3. Decode the payload; an undecodable payload under a valid signature
///    is [`VerifyError::Malformed`].
/// 4. `now > exp` is [`VerifyError::Expired`].
pub fn verify(token: &str, now: i64, secret: &[u8]) -> Result<Claims, VerifyError> {
    let mut segments = token.split('.');
    let (header, payload, signature) = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(VerifyError::Malformed),
    };

    let expected = sign(format!("{header}.{payload}").as_bytes(), secret);
    if !constant_time_str_eq(signature, &expected) {
        return Err(VerifyError::BadSignature);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| VerifyError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| VerifyError::Malformed)?;

    if now > claims.exp {
        return Err(VerifyError::Expired);
    }

    Ok(claims)
}

/// Token mint/check handle owned by the application state.
///
/// Holds the immutable server secret and the configured session TTL, and
/// supplies the system clock. Cheap to clone; the secret is shared.
#[derive(Clone)]
pub struct TokenSigner {
    secret: std::sync::Arc<[u8]>,
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: i64) -> Self {
        Self {
            secret: secret.into().into(),
            ttl_secs,
        }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    /// Mints a session token for a verified identity.
    pub fn issue(&self, id: &str, name: &str) -> String {
        issue_at(id, name, self.ttl_secs, Self::now(), &self.secret)
    }

    /// Verifies a presented bearer token against the current clock.
    pub fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        verify(token, Self::now(), &self.secret)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose the secret through Debug output
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-secret-0123456789abcdef";
    const WEEK: i64 = 604_800;

    fn alice_token(now: i64) -> String {
        issue_at("u1", "alice", WEEK, now, SECRET)
    }

    #[test]
    fn round_trip_returns_original_claims() {
        let token = alice_token(1_000);
        let claims = verify(&token, 1_000, SECRET).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.name, "alice");
        assert_eq!(claims.exp, 1_000 + WEEK);
    }

    #[test]
    fn accepted_just_before_expiry_rejected_just_after() {
        let token = alice_token(1_000);
        assert!(verify(&token, 1_000 + WEEK - 1, SECRET).is_ok());
        // Valid at exactly exp; expiry is strictly-after
        assert!(verify(&token, 1_000 + WEEK, SECRET).is_ok());
        assert_eq!(
            verify(&token, 1_000 + WEEK + 1, SECRET),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn every_signature_mutation_is_bad_signature() {
        let token = alice_token(1_000);
        let dot = token.rfind('.').unwrap();
        let (prefix, signature) = token.split_at(dot + 1);

        for i in 0..signature.len() {
            let mut bytes = signature.as_bytes().to_vec();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let mutated = format!("{prefix}{}", String::from_utf8(bytes).unwrap());
            assert_eq!(
                verify(&mutated, 1_000, SECRET),
                Err(VerifyError::BadSignature),
                "mutation at signature byte {i} was not rejected"
            );
        }
    }

    #[test]
    fn wrong_secret_is_bad_signature() {
        let token = alice_token(1_000);
        assert_eq!(
            verify(&token, 1_000, b"a-different-secret"),
            Err(VerifyError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_is_bad_signature() {
        let token = alice_token(1_000);
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD
            .encode(br#"{"sub":"u2","name":"mallory","exp":9999999999}"#);
        parts[1] = &forged;
        assert_eq!(
            verify(&parts.join("."), 1_000, SECRET),
            Err(VerifyError::BadSignature)
        );
    }

    #[test]
    fn wrong_segment_count_is_malformed() {
        let token = alice_token(1_000);
        let two_segments = token.rsplit_once('.').unwrap().0;
        assert_eq!(verify(two_segments, 1_000, SECRET), Err(VerifyError::Malformed));
        assert_eq!(
            verify(&format!("{token}.extra"), 1_000, SECRET),
            Err(VerifyError::Malformed)
        );
        assert_eq!(verify("", 1_000, SECRET), Err(VerifyError::Malformed));
        assert_eq!(verify("not-a-token", 1_000, SECRET), Err(VerifyError::Malformed));
    }

    #[test]
    fn expired_wins_only_after_signature_check() {
        // A tampered, expired token must report BadSignature, not Expired
        let token = alice_token(0);
        let mut mutated = token.clone();
        let last = mutated.pop().unwrap();
        mutated.push(if last == 'A' { 'B' } else { 'A' });
        assert_eq!(
            verify(&mutated, WEEK * 2, SECRET),
            Err(VerifyError::BadSignature)
        );
    }

    #[test]
    fn week_long_session_scenario() {
        // issue({id:"u1",name:"alice"}, ttl=604800) at t=1000
        let token = issue_at("u1", "alice", 604_800, 1_000, SECRET);
        let claims = verify(&token, 1_000 + 604_800 - 1, SECRET).unwrap();
        assert_eq!((claims.sub.as_str(), claims.name.as_str()), ("u1", "alice"));
        assert_eq!(
            verify(&token, 1_000 + 604_800 + 1, SECRET),
            Err(VerifyError::Expired)
        );
    }

    #[test]
    fn issuance_is_deterministic() {
        assert_eq!(alice_token(1_000), alice_token(1_000));
    }

    #[test]
    fn signer_round_trip() {
        let signer = TokenSigner::new(SECRET.to_vec(), WEEK);
        let token = signer.issue("u7", "bob");
        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.sub, "u7");
        assert_eq!(claims.name, "bob");
    }

    #[test]
    fn signer_debug_hides_secret() {
        let signer = TokenSigner::new(b"super-secret".to_vec(), 60);
        assert!(!format!("{signer:?}").contains("super-secret"));
    }
}
