//! Guestbook backend: a visitor counter and message board with stateless
//! bearer-token session authentication.
//!
//! The crate is organized around a handful of seams:
//!
//! - [`token`]: HMAC-SHA256 signed session tokens (issue and verify)
//! - [`password`]: credential digests and constant-time verification
//! - [`store`]: the [`Store`](store::Store) trait with an in-memory
//!   backend; [`database`] adds the PostgreSQL backend
//! - [`routes`]: the axum router and handlers
//! - [`config`] and [`observability`]: environment-driven startup,
//!   fail-fast secret validation, structured security logging
//!
//! Handlers stay testable by construction: state is injected through
//! [`routes::AppState`], the clock reaches the token layer as plain unix
//! seconds, and every backend sits behind a trait object.

pub mod auth;
pub mod config;
pub mod crypto;
#[cfg(feature = "postgres")]
pub mod database;
pub mod error;
pub mod lockout;
pub mod observability;
pub mod password;
pub mod routes;
pub mod store;
pub mod token;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
pub use routes::{router, AppState};
pub use store::{MemoryStore, Store};
pub use token::TokenSigner;
