//! HTTP service for the earth catalog.
//!
//! Wires configuration, the SQLite pool and the axum router together. The
//! binary in `main.rs` only parses arguments and calls [`serve`].

pub mod config;
pub mod context;
pub mod error;
pub mod routes;

pub use config::{ConfigOverrides, ServerConfig};
pub use context::AppContext;
pub use error::{ApiError, ServerError};
pub use routes::create_router;

/// Migrate, bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    log::info!("Starting with {config}");
    let listen = config.listen;
    let ctx = AppContext::start(config).await?;

    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("[http] Listen and serve at {listen}");
    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("[http] Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {e}");
    }
}
