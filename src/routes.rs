//! HTTP surface: router construction, shared state, and handlers.
//!
//! Handlers are plain async functions over extractors, so tests exercise
//! them directly against a [`MemoryStore`](crate::store::MemoryStore)
//! without standing up a listener.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use uuid::Uuid;

use crate::auth::{authenticate, AuthUser};
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::lockout::{LockoutStatus, LoginTracker};
use crate::observability::SecurityEvent;
use crate::password::hash_password;
use crate::security_event;
use crate::store::{Message, NewUser, Store, User};
use crate::token::TokenSigner;
use crate::validation::{
    validate_email, validate_message_content, validate_password, validate_username,
};

/// Messages returned per listing request.
const MESSAGE_LIST_LIMIT: i64 = 100;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub signer: TokenSigner,
    pub tracker: Arc<LoginTracker>,
}

/// Builds the application router with the middleware stack applied.
pub fn router(state: AppState) -> Router {
    let timeout = state.config.request_timeout;
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/api/health", get(health))
        .route("/api/visitors", get(visitors))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/user/me", get(me))
        .route("/api/messages", get(list_messages).post(post_message))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(RequestBodyLimitLayer::new(max_body))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    state
        .store
        .ping()
        .await
        .map_err(|e| AppError::unavailable(format!("store unavailable: {e}")))?;
    Ok(Json(HealthResponse {
        status: "ok",
        store: "ok",
    }))
}

#[derive(Debug, Serialize)]
pub struct VisitorsResponse {
    pub count: i64,
}

/// Increments the visitor counter and returns the new total.
async fn visitors(State(state): State<AppState>) -> Result<Json<VisitorsResponse>> {
    let count = state.store.record_visit().await?;
    Ok(Json(VisitorsResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let user = state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash: hash_password(&req.password),
        })
        .await?;

    security_event!(
        SecurityEvent::UserRegistered,
        username = %user.username,
        user_id = %user.id,
        "account created"
    );

    let token = state.signer.issue(&user.id.to_string(), &user.username);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    // Lockout is checked before credentials so a locked identifier costs
    // nothing to reject
    if let LockoutStatus::Locked(remaining) = state.tracker.check(&req.username) {
        return Err(AppError::rate_limited(format!(
            "too many failed attempts, retry in {}s",
            remaining.as_secs().max(1)
        )));
    }

    let user = match authenticate(state.store.as_ref(), &req.username, &req.password).await {
        Ok(user) => user,
        Err(err) => {
            if err.kind == crate::error::ErrorKind::Unauthorized {
                if let LockoutStatus::Locked(_) = state.tracker.record_failure(&req.username) {
                    security_event!(
                        SecurityEvent::AccountLocked,
                        username = %req.username,
                        "login lockout engaged"
                    );
                }
            }
            return Err(err);
        }
    };

    state.tracker.record_success(&user.username);
    security_event!(
        SecurityEvent::AuthenticationSuccess,
        username = %user.username,
        user_id = %user.id,
        "login succeeded"
    );

    let token = state.signer.issue(&user.id.to_string(), &user.username);
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<MeResponse>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized("unknown user"))?;
    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        created_at: user.created_at,
    }))
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

async fn list_messages(State(state): State<AppState>) -> Result<Json<MessagesResponse>> {
    let messages = state.store.list_messages(MESSAGE_LIST_LIMIT).await?;
    Ok(Json(MessagesResponse { messages }))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let content = validate_message_content(&req.content)?;
    let message = state
        .store
        .add_message(auth.user_id, &auth.username, content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
