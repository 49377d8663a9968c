//! PostgreSQL store backend.
//!
//! Pool construction follows conservative defaults: bounded connections,
//! aggressive timeouts, connections tested before use, SSL required unless
//! explicitly relaxed. The pool is built once at startup and injected into
//! [`PostgresStore`]; nothing caches a handle at module level.

use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{Message, NewUser, Store, StoreError, User};

/// Connection pool configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// From `DATABASE_URL` (required when the postgres backend is selected).
    pub database_url: String,
    /// From `DB_MAX_CONNECTIONS` (default 10).
    pub max_connections: u32,
    /// From `DB_MIN_CONNECTIONS` (default 1).
    pub min_connections: u32,
    /// From `DB_ACQUIRE_TIMEOUT_SECS` (default 30).
    pub acquire_timeout: Duration,
    /// From `DB_SSL_MODE`: `disable`, `prefer`, or `require` (default require).
    pub ssl_mode: SslMode,
    /// From `DB_AUTO_MIGRATE` (default true).
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    /// No SSL. Development only.
    Disable,
    /// SSL when the server offers it.
    Prefer,
    /// Refuse unencrypted connections.
    Require,
}

impl From<SslMode> for PgSslMode {
    fn from(mode: SslMode) -> Self {
        match mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        }
    }
}

impl DatabaseConfig {
    /// Loads pool settings from the environment.
    ///
    /// Returns an error (rather than defaulting) when `DATABASE_URL` is
    /// absent, so a misconfigured deployment fails at startup.
    pub fn from_env() -> Result<Self, StoreError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::Backend("DATABASE_URL is not set".into()))?;

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let acquire_timeout = std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let ssl_mode = match std::env::var("DB_SSL_MODE").as_deref() {
            Ok("disable") => SslMode::Disable,
            Ok("prefer") => SslMode::Prefer,
            _ => SslMode::Require,
        };

        let auto_migrate = std::env::var("DB_AUTO_MIGRATE")
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            database_url,
            max_connections,
            min_connections,
            acquire_timeout,
            ssl_mode,
            auto_migrate,
        })
    }
}

/// Builds the connection pool, runs migrations if configured, and verifies
/// the connection with a round trip.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    info!(
        max_connections = config.max_connections,
        ssl_mode = ?config.ssl_mode,
        auto_migrate = config.auto_migrate,
        "initializing database pool"
    );

    let connect_options = PgConnectOptions::from_str(&config.database_url)
        .map_err(|e| StoreError::Backend(format!("invalid DATABASE_URL: {e}")))?
        .ssl_mode(config.ssl_mode.into());

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .test_before_acquire(true)
        .connect_with(connect_options)
        .await
        .map_err(|e| StoreError::Backend(format!("connection failed: {e}")))?;

    if config.auto_migrate {
        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
    }

    let probe: (i32,) = sqlx::query_as("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("startup probe failed: {e}")))?;
    if probe.0 != 1 {
        return Err(StoreError::Backend("unexpected startup probe result".into()));
    }

    if config.ssl_mode == SslMode::Disable {
        warn!("database SSL is disabled");
    }
    info!("database pool ready");

    Ok(pool)
}

/// PostgreSQL-backed [`Store`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_error(e: sqlx::Error) -> StoreError {
    // Unique violations are mapped by constraint name; anything else is an
    // opaque backend failure so schema details never reach clients.
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains("email") {
                return StoreError::EmailTaken;
            }
            return StoreError::UsernameTaken;
        }
    }
    StoreError::Backend(e.to_string())
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, username, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, now()) \
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn record_visit(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "INSERT INTO visitors (id, count) VALUES (1, 1) \
             ON CONFLICT (id) DO UPDATE SET count = visitors.count + 1 \
             RETURNING count",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(count)
    }

    async fn list_messages(&self, limit: i64) -> Result<Vec<Message>, StoreError> {
        sqlx::query_as::<_, Message>(
            "SELECT id, user_id, username, content, created_at \
             FROM messages ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn add_message(
        &self,
        user_id: Uuid,
        username: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (id, user_id, username, content, created_at) \
             VALUES ($1, $2, $3, $4, now()) \
             RETURNING id, user_id, username, content, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(username)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(query_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(query_error)
    }
}
