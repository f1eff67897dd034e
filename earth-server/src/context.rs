use std::sync::Arc;

use earth_db::{DbPool, Migrations, RepositoryError, create_pool, run_migrations};
use rusqlite::Connection;

use crate::config::ServerConfig;
use crate::error::{ApiError, ServerError};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppContext {
    pub pool: DbPool,
    pub config: Arc<ServerConfig>,
}

impl AppContext {
    /// Build the pool and migrate the database. Migration failure is fatal.
    pub fn initialize(config: ServerConfig) -> Result<Self, ServerError> {
        let migrations = match &config.migrations_dir {
            Some(dir) => Migrations::from_dir(dir)?,
            None => Migrations::embedded(),
        };
        let pool = create_pool(&config.database, config.pool_size)?;
        let conn = pool.get()?;
        run_migrations(&conn, &migrations)?;
        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// [`AppContext::initialize`] on the blocking thread pool.
    pub async fn start(config: ServerConfig) -> Result<Self, ServerError> {
        tokio::task::spawn_blocking(move || Self::initialize(config)).await?
    }

    /// Run `f` on a pooled connection off the async runtime.
    pub async fn with_connection<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn).map_err(ApiError::from)
        })
        .await?
    }
}
