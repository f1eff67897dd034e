//! Shared connection pool.

use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::schema::configure_connection;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        configure_connection(conn)
    }
}

/// Build a pool of connections to the database file at `path`.
///
/// The pool does not migrate; run [`crate::run_migrations`] on one of its
/// connections before serving requests.
pub fn create_pool(path: &Path, max_size: u32) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA journal_mode=WAL;"));
    Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(30))
        .connection_customizer(Box::new(ConnectionCustomizer))
        .build(manager)
}
