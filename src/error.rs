//! HTTP error responses.
//!
//! Rejections are ordinary typed values all the way to the edge; this
//! module owns the mapping from domain outcomes to status codes and the
//! JSON error envelope. Internal failure detail is logged with the request
//! but only exposed in the response body when development mode is
//! configured.
//!
//! Mapping decisions for authentication outcomes:
//! - missing bearer token: 401
//! - malformed or bad-signature token: 403
//! - expired token: 401 (the client should simply log in again)
//! - login failure: 401 with one generic message for both unknown
//!   identifier and digest mismatch, so responses cannot be used to
//!   enumerate usernames

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use std::sync::OnceLock;

use crate::password::CredentialError;
use crate::store::StoreError;
use crate::token::VerifyError;
use crate::validation::ValidationError;

/// Whether error responses include internal detail. Set once at startup.
static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

/// Configures detail exposure; call once at startup. `true` for
/// development, `false` for production.
pub fn init(expose_details: bool) {
    let _ = EXPOSE_DETAILS.set(expose_details);
}

fn expose_details() -> bool {
    *EXPOSE_DETAILS.get_or_init(|| false)
}

/// Error categories with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    RateLimited,
    Internal,
    Unavailable,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Client-error kinds whose message is always safe to return.
    fn message_is_safe(&self) -> bool {
        !matches!(self, Self::Internal | Self::Unavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Validation => "validation_error",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal_error",
            Self::Unavailable => "service_unavailable",
        };
        write!(f, "{name}")
    }
}

/// Application error returned by handlers.
#[derive(Debug)]
pub struct AppError {
    pub kind: ErrorKind,
    /// User-facing message (for client-error kinds).
    pub message: String,
    /// Internal detail: logged, exposed only in development.
    pub details: Option<String>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message)
    }

    pub fn internal(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            details: Some(detail.to_string()),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, message)
    }

    fn log(&self) {
        let details = self.details.as_deref().unwrap_or("none");
        match self.kind {
            ErrorKind::Internal | ErrorKind::Unavailable => {
                tracing::error!(
                    error_kind = %self.kind,
                    message = %self.message,
                    details = %details,
                    "internal error"
                );
            }
            ErrorKind::Unauthorized | ErrorKind::Forbidden | ErrorKind::RateLimited => {
                tracing::warn!(error_kind = %self.kind, message = %self.message, "auth error");
            }
            _ => {
                tracing::debug!(error_kind = %self.kind, message = %self.message, "client error");
            }
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

/// JSON error envelope.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.kind.status_code();
        let message = if self.kind.message_is_safe() || expose_details() {
            self.message
        } else {
            "An internal error occurred".to_string()
        };

        let body = ErrorResponse {
            error: self.kind.to_string(),
            message,
            details: if expose_details() { self.details } else { None },
        };

        (status, Json(body)).into_response()
    }
}

impl From<VerifyError> for AppError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::Malformed | VerifyError::BadSignature => {
                AppError::forbidden("invalid token")
            }
            VerifyError::Expired => AppError::unauthorized("token expired"),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(_: CredentialError) -> Self {
        // One generic outcome for both variants; the distinction is logged
        // at the call site, never surfaced
        AppError::unauthorized("invalid username or password")
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken | StoreError::EmailTaken => {
                AppError::new(ErrorKind::Conflict, err.to_string())
            }
            StoreError::Backend(detail) => AppError::internal("storage error", detail),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, err.to_string())
    }
}

/// Result alias for handlers.
pub type Result<T> = std::result::Result<T, AppError>;
