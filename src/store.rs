//! Storage abstraction for users, the visitor counter, and messages.
//!
//! Handlers receive an explicitly constructed `Arc<dyn Store>` through the
//! application state; there is no module-level cached connection handle.
//! [`MemoryStore`] is the in-process backend (and the test double); the
//! PostgreSQL backend lives in [`crate::database`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A registered account. The password digest never leaves the store layer
/// except into credential verification.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create an account. The digest is computed by the
/// caller; the store never sees a plaintext secret.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A message board entry. Serialized directly into list responses.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Storage errors surfaced to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The username is already registered.
    UsernameTaken,
    /// The email is already registered.
    EmailTaken,
    /// Backend failure (connection, query). Details are logged, not exposed.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UsernameTaken => write!(f, "username already exists"),
            Self::EmailTaken => write!(f, "email already registered"),
            Self::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Backend-agnostic storage operations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates an account; fails with `UsernameTaken`/`EmailTaken` on conflict.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Increments the visitor counter and returns the new value.
    async fn record_visit(&self) -> Result<i64, StoreError>;

    /// Returns up to `limit` messages, newest first.
    async fn list_messages(&self, limit: i64) -> Result<Vec<Message>, StoreError>;

    async fn add_message(
        &self,
        user_id: Uuid,
        username: &str,
        content: &str,
    ) -> Result<Message, StoreError>;

    /// Liveness check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryInner {
    users: Vec<User>,
    visitors: i64,
    messages: Vec<Message>,
}

/// In-process store. Suitable for development and tests; data does not
/// survive a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write();
        if inner.users.iter().any(|u| u.username == new_user.username) {
            return Err(StoreError::UsernameTaken);
        }
        if inner.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.inner.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn record_visit(&self) -> Result<i64, StoreError> {
        let mut inner = self.inner.write();
        inner.visitors += 1;
        Ok(inner.visitors)
    }

    async fn list_messages(&self, limit: i64) -> Result<Vec<Message>, StoreError> {
        // Messages are appended chronologically; newest first is a reverse walk
        Ok(self
            .inner
            .read()
            .messages
            .iter()
            .rev()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn add_message(
        &self,
        user_id: Uuid,
        username: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: Uuid::new_v4(),
            user_id,
            username: username.to_owned(),
            content: content.to_owned(),
            created_at: Utc::now(),
        };
        self.inner.write().messages.push(message.clone());
        Ok(message)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
