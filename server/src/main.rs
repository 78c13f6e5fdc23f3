#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;
use std::sync::Arc;

use gateway::{
    auth::AuthService,
    config::ServerConfig,
    server::{AppState, router},
    store::AnyUserStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: listen={}:{}, token_ttl={}s, jwt={}",
        config.listen_host,
        config.listen_port,
        config.access_token_ttl.as_secs(),
        config
            .jwt_config
            .as_ref()
            .map_or("not configured", |jwt| jwt.algorithm().as_str()),
    );
    if config.jwt_config.is_none() {
        tracing::warn!("JWT_SECRET is not set; logins will be refused");
    }

    let store = match AnyUserStore::from_config(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to create credential store: {e}");
            std::process::exit(1);
        }
    };

    let auth = Arc::new(AuthService::from_config(store, &config));
    let app = router(AppState::new(auth), &config.cors_allow_origins);

    let addr = SocketAddr::new(config.listen_host, config.listen_port);
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
