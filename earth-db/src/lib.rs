//! SQLite persistence layer for the earth catalog.
//!
//! Provides schema migration, a connection pool, identifier resolution, and
//! CRUD plus listing for continents, countries and cities, backed by SQLite
//! (via rusqlite with bundled feature).

pub mod city;
pub mod continent;
pub mod country;
pub mod filter;
pub mod pool;
pub mod repository;
pub mod resolver;
pub mod schema;

pub use city::list_cities;
pub use continent::list_continents;
pub use country::list_countries;
pub use filter::ParentFilter;
pub use pool::{DbConnection, DbPool, create_pool};
pub use repository::{
    Entity, RepositoryError, create, find_by_uuid, get_by_uuid, soft_delete, update,
};
pub use resolver::{resolve_identifier, resolve_identifiers_bulk, resolve_index};
pub use schema::{
    MIGRATION_FILES, Migration, MigrationError, MigrationReport, Migrations, open_database,
    open_memory, run_migrations,
};
