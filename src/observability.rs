//! Logging setup and structured security events.
//!
//! Handlers log through the [`security_event!`] macro so every
//! security-relevant record carries the same `security_event`, `category`,
//! and `severity` fields regardless of which endpoint emitted it. Plain
//! operational logging uses `tracing` directly.

use std::fmt;
use tracing_subscriber::{fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format, from `LOG_FORMAT` (`json` or `compact`, default compact).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        };
        Self {
            log_format,
            log_filter: std::env::var("LOG_FILTER").unwrap_or_else(|_| "info".into()),
        }
    }
}

/// Initializes the tracing subscriber. Call once at startup before any
/// logging occurs.
pub fn init(config: &ObservabilityConfig) -> Result<(), ObservabilityError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .map_err(|e| ObservabilityError(format!("invalid log filter: {e}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(subscriber_fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| ObservabilityError(format!("failed to init tracing: {e}"))),
        LogFormat::Compact => registry
            .with(subscriber_fmt::layer().compact().with_target(true))
            .try_init()
            .map_err(|e| ObservabilityError(format!("failed to init tracing: {e}"))),
    }
}

#[derive(Debug)]
pub struct ObservabilityError(pub String);

impl fmt::Display for ObservabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observability error: {}", self.0)
    }
}

impl std::error::Error for ObservabilityError {}

/// Security event categories emitted by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    /// Credentials verified, session token minted.
    AuthenticationSuccess,
    /// Login rejected (unknown identifier or digest mismatch).
    AuthenticationFailure,
    /// New account created.
    UserRegistered,
    /// Bearer token rejected on a protected endpoint.
    AccessDenied,
    /// Login endpoint locked out after repeated failures.
    AccountLocked,
    /// Process startup.
    SystemStartup,
}

impl SecurityEvent {
    pub fn category(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess | Self::AuthenticationFailure => "authentication",
            Self::AccessDenied => "authorization",
            Self::UserRegistered => "user_management",
            Self::AccountLocked => "security",
            Self::SystemStartup => "system",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::AccountLocked => Severity::Critical,
            Self::AuthenticationFailure | Self::AccessDenied => Severity::High,
            Self::AuthenticationSuccess | Self::UserRegistered => Severity::Medium,
            Self::SystemStartup => Severity::Low,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthenticationSuccess => "authentication_success",
            Self::AuthenticationFailure => "authentication_failure",
            Self::UserRegistered => "user_registered",
            Self::AccessDenied => "access_denied",
            Self::AccountLocked => "account_locked",
            Self::SystemStartup => "system_startup",
        }
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Event severity, mapped onto tracing levels by the macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Logs a security event with consistent structured fields.
///
/// ```ignore
/// security_event!(
///     SecurityEvent::AuthenticationFailure,
///     username = %username,
///     "login rejected"
/// );
/// ```
#[macro_export]
macro_rules! security_event {
    ($event:expr, $($field:tt)*) => {{
        let event = $event;
        match event.severity() {
            $crate::observability::Severity::Critical => ::tracing::error!(
                security_event = event.name(),
                category = event.category(),
                severity = "critical",
                $($field)*
            ),
            $crate::observability::Severity::High => ::tracing::warn!(
                security_event = event.name(),
                category = event.category(),
                severity = "high",
                $($field)*
            ),
            $crate::observability::Severity::Medium => ::tracing::info!(
                security_event = event.name(),
                category = event.category(),
                severity = "medium",
                $($field)*
            ),
            $crate::observability::Severity::Low => ::tracing::debug!(
                security_event = event.name(),
                category = event.category(),
                severity = "low",
                $($field)*
            ),
        }
    }};
}

pub use crate::security_event;
