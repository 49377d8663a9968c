//! Application configuration.
//!
//! One validated [`AppConfig`] is built from the process environment at
//! startup and handed to the rest of the system. Nothing else in the crate
//! reads environment variables; in particular the token secret is loaded
//! and checked exactly once, and startup fails fast if it is missing or too
//! weak for the environment instead of falling back to a baked-in default.

use std::fmt;
use std::time::Duration;

/// Deployment environment, from `APP_ENV` (default `development`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Which store backend to construct at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; data does not survive a restart.
    Memory,
    /// PostgreSQL via sqlx (requires the `postgres` feature).
    Postgres,
}

/// Validated process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to bind, from `BIND_ADDR` (default `0.0.0.0:3000`).
    pub bind_addr: String,

    /// Deployment environment.
    pub environment: Environment,

    /// Token signing secret, from `TOKEN_SECRET`. Opaque bytes from here on.
    pub token_secret: String,

    /// Session token lifetime, from `TOKEN_TTL_SECS` (default 7 days).
    pub token_ttl_secs: i64,

    /// Store backend, from `STORE` (`memory` or `postgres`).
    pub store_backend: StoreBackend,

    /// Per-request timeout, from `REQUEST_TIMEOUT` (default `30s`).
    pub request_timeout: Duration,

    /// Maximum request body size in bytes, from `MAX_BODY_BYTES` (default 64 KiB).
    pub max_body_bytes: usize,
}

/// Configuration errors. All of these abort startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    Missing(&'static str),
    /// A variable is set but cannot be parsed.
    Invalid { name: &'static str, reason: String },
    /// The token secret does not meet the policy for this environment.
    WeakSecret(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "required environment variable {name} is not set"),
            Self::Invalid { name, reason } => write!(f, "invalid value for {name}: {reason}"),
            Self::WeakSecret(reason) => write!(f, "TOKEN_SECRET rejected: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Loads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = Environment::from_str(
            &std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
        );

        let token_secret =
            std::env::var("TOKEN_SECRET").map_err(|_| ConfigError::Missing("TOKEN_SECRET"))?;
        SecretPolicy::for_environment(environment).validate(&token_secret)?;

        let token_ttl_secs = match std::env::var("TOKEN_TTL_SECS") {
            Ok(s) => s.parse::<i64>().map_err(|e| ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: e.to_string(),
            })?,
            Err(_) => 7 * 24 * 60 * 60,
        };
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_SECS",
                reason: "must be positive".into(),
            });
        }

        let store_backend = match std::env::var("STORE").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE",
                    reason: format!("unknown backend '{other}' (expected memory or postgres)"),
                })
            }
        };

        let request_timeout = match std::env::var("REQUEST_TIMEOUT") {
            Ok(s) => parse_duration(&s).ok_or_else(|| ConfigError::Invalid {
                name: "REQUEST_TIMEOUT",
                reason: format!("cannot parse '{s}' as a duration"),
            })?,
            Err(_) => Duration::from_secs(30),
        };

        let max_body_bytes = match std::env::var("MAX_BODY_BYTES") {
            Ok(s) => s.parse::<usize>().map_err(|e| ConfigError::Invalid {
                name: "MAX_BODY_BYTES",
                reason: e.to_string(),
            })?,
            Err(_) => 64 * 1024,
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            environment,
            token_secret,
            token_ttl_secs,
            store_backend,
            request_timeout,
            max_body_bytes,
        })
    }
}

/// Strength requirements for the token signing secret.
///
/// Production requires a secret long enough to carry the full HMAC key
/// strength and refuses placeholder values; development only refuses the
/// obviously broken.
#[derive(Debug, Clone)]
pub struct SecretPolicy {
    pub min_length: usize,
    pub check_weak_patterns: bool,
    context: &'static str,
}

impl SecretPolicy {
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Production => Self {
                min_length: 48,
                check_weak_patterns: true,
                context: "production",
            },
            Environment::Development => Self {
                min_length: 16,
                check_weak_patterns: true,
                context: "development",
            },
        }
    }

    pub fn validate(&self, secret: &str) -> Result<(), ConfigError> {
        if secret.len() < self.min_length {
            return Err(self.reject(format!(
                "{} chars is below the {}-char minimum for {}",
                secret.len(),
                self.min_length,
                self.context
            )));
        }
        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(secret) {
                return Err(self.reject(format!("contains weak pattern '{pattern}'")));
            }
        }
        Ok(())
    }

    /// Rejection messages carry a freshly generated replacement that meets
    /// this policy, so a failed startup tells the operator exactly what to
    /// set.
    fn reject(&self, reason: String) -> ConfigError {
        ConfigError::WeakSecret(format!(
            "{reason}; replace it with a generated value such as {}",
            generate_secret(self.min_length)
        ))
    }
}

fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "changeme", "default", "example", "your-jwt",
        "qwerty", "123456", "letmein",
    ];
    let lower = secret.to_lowercase();
    WEAK_PATTERNS.iter().copied().find(|p| lower.contains(p))
}

/// Generates a random secret suitable for the given environment.
pub fn generate_secret(length: usize) -> String {
    use rand::Rng;

    const CHARSET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Parses `"30s"`, `"15m"`, `"2h"` or a bare number of seconds.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };
    let value: u64 = value.parse().ok()?;
    match unit.trim() {
        "s" | "" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 60 * 60)),
        _ => None,
    }
}
