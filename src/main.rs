use std::sync::Arc;

use guestbook::config::{AppConfig, Environment, StoreBackend};
use guestbook::lockout::{LockoutPolicy, LoginTracker};
use guestbook::observability::{self, ObservabilityConfig, SecurityEvent};
use guestbook::routes::{router, AppState};
use guestbook::security_event;
use guestbook::store::{MemoryStore, Store};
use guestbook::token::TokenSigner;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first so a bad deployment fails before anything listens
    let config = AppConfig::from_env()?;
    observability::init(&ObservabilityConfig::from_env())?;
    guestbook::error::init(config.environment == Environment::Development);

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => {
            let db_config = guestbook::database::DatabaseConfig::from_env()?;
            let pool = guestbook::database::create_pool(&db_config).await?;
            Arc::new(guestbook::database::PostgresStore::new(pool))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackend::Postgres => {
            return Err("postgres backend selected but the crate was built without it".into());
        }
    };

    let state = AppState {
        signer: TokenSigner::new(config.token_secret.as_bytes(), config.token_ttl_secs),
        store,
        tracker: Arc::new(LoginTracker::new(LockoutPolicy::default())),
        config: Arc::new(config),
    };

    let bind_addr = state.config.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    security_event!(
        SecurityEvent::SystemStartup,
        addr = %bind_addr,
        "server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}
