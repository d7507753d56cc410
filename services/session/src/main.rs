//! Session Service entry point.
//!
//! Issues and rotates access/refresh token pairs over HTTP.

use std::sync::Arc;

use anyhow::Context;
use rust_common::{RetryPolicy, TracingConfig, init_tracing};
use session_service::clock::SystemClock;
use session_service::config::{Config, StoreBackend};
use session_service::shutdown::wait_for_signal;
use session_service::store::{InMemorySessionStore, RedisSessionStore, SessionStore};
use session_service::{SessionService, api};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    init_tracing(
        &TracingConfig::default()
            .with_service_name("session-service")
            .with_log_level(config.log_level.clone())
            .with_json_output(config.log_json),
    );

    info!("Starting Session Service");

    let store: Arc<dyn SessionStore> = match config.session_store {
        StoreBackend::Memory => {
            warn!("Using in-memory session store; sessions are lost on restart");
            Arc::new(InMemorySessionStore::new())
        }
        StoreBackend::Redis => Arc::new(
            RedisSessionStore::connect(
                &config.redis_url,
                config.redis_key_prefix.clone(),
                &RetryPolicy::default(),
            )
            .await
            .context("connecting to Redis")?,
        ),
    };

    let service = SessionService::from_config(&config, store, Arc::new(SystemClock))
        .context("building session service")?;
    let app = api::router(Arc::new(service));

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;

    info!(address = %addr, "Session Service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await
        .context("serving HTTP")?;

    info!("Session Service stopped");
    Ok(())
}
