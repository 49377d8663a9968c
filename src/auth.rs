//! Credential verification and the bearer-token request extractor.
//!
//! [`authenticate`] is the only place that inspects which way a login
//! failed; the distinction is logged here and collapsed into one generic
//! rejection before it leaves this module. [`AuthUser`] is the extractor
//! protected handlers take as an argument; a request without a valid
//! bearer token never reaches the handler body.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::error::AppError;
use crate::observability::SecurityEvent;
use crate::password::{hash_password, verify_password, CredentialError};
use crate::routes::AppState;
use crate::security_event;
use crate::store::{Store, User};

/// Verifies a username/password pair against the store.
///
/// Unknown identifiers still pay for a digest comparison so the two
/// failure modes take the same code path.
pub async fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = match store.find_user_by_username(username).await? {
        Some(user) => user,
        None => {
            let placeholder = hash_password("placeholder-credential");
            let _ = verify_password(password, &placeholder);
            security_event!(
                SecurityEvent::AuthenticationFailure,
                username = %username,
                reason = "unknown_identifier",
                "login rejected"
            );
            return Err(CredentialError::IdentityNotFound.into());
        }
    };

    if !verify_password(password, &user.password_hash) {
        security_event!(
            SecurityEvent::AuthenticationFailure,
            username = %username,
            reason = "credential_mismatch",
            "login rejected"
        );
        return Err(CredentialError::CredentialMismatch.into());
    }

    Ok(user)
}

/// The identity carried by a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::unauthorized("missing bearer token"))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("missing bearer token"))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(parts) {
            Ok(token) => token,
            Err(err) => {
                security_event!(
                    SecurityEvent::AccessDenied,
                    path = %parts.uri.path(),
                    reason = "missing_token",
                    "request rejected"
                );
                return Err(err);
            }
        };

        let claims = state.signer.verify(token).map_err(|e| {
            security_event!(
                SecurityEvent::AccessDenied,
                path = %parts.uri.path(),
                reason = %e,
                "request rejected"
            );
            AppError::from(e)
        })?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::forbidden("invalid token"))?;

        Ok(AuthUser {
            user_id,
            username: claims.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{MemoryStore, NewUser};

    async fn store_with_user(username: &str, password: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_user(NewUser {
                username: username.into(),
                email: format!("{username}@example.com"),
                password_hash: hash_password(password),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn valid_credentials_pass() {
        let store = store_with_user("alice", "correct horse").await;
        let user = authenticate(&store, "alice", "correct horse").await.unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_are_indistinguishable() {
        let store = store_with_user("alice", "correct horse").await;

        let unknown = authenticate(&store, "mallory", "whatever").await.unwrap_err();
        let mismatch = authenticate(&store, "alice", "wrong").await.unwrap_err();

        assert_eq!(unknown.kind, ErrorKind::Unauthorized);
        assert_eq!(unknown.kind, mismatch.kind);
        assert_eq!(unknown.message, mismatch.message);
    }

    #[test]
    fn bearer_parsing() {
        use axum::http::Request;

        let parts = |value: Option<&str>| {
            let mut builder = Request::builder().uri("/api/messages");
            if let Some(v) = value {
                builder = builder.header(AUTHORIZATION, v);
            }
            builder.body(()).unwrap().into_parts().0
        };

        assert_eq!(bearer_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
        assert!(bearer_token(&parts(None)).is_err());
        assert!(bearer_token(&parts(Some("abc.def.ghi"))).is_err());
        assert!(bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
    }
}
