//! Generic CRUD over continent, country and city rows.
//!
//! Each entity type implements [`Entity`]: it names its table and columns and
//! supplies the per-type hooks (validation, parent resolution, uniqueness
//! check, insert and update). The operations here are shared by all three.
//!
//! Every function takes a `&Connection`. Pass a `&Transaction` to run several
//! calls atomically; otherwise each statement autocommits on its own.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};
use earth_catalog::{
    DatabaseIndex, DeletedState, IdentifierError, ValidationError, is_valid_identifier,
    new_identifier,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use serde::de::DeserializeOwned;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    ValidationFailed(#[from] ValidationError),
    #[error("SQLite error: {0}")]
    Store(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IdentifierError> for RepositoryError {
    fn from(e: IdentifierError) -> Self {
        Self::InvalidIdentifier(e.to_string())
    }
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True for errors caused by the request rather than the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Json(_))
    }
}

/// A row type stored in its own table with `idx`, `uuid` and `deleted_state`
/// columns.
pub trait Entity: Clone + Sized {
    /// Table name, also used as the entity label in errors and logs.
    const TABLE: &'static str;
    /// Columns read by [`Entity::from_row`], in order.
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn index(&self) -> DatabaseIndex;
    fn uuid(&self) -> Uuid;

    fn validate_create(&self) -> Result<(), ValidationError>;
    fn validate_update(&self) -> Result<(), ValidationError>;

    /// Translate parent identifiers to internal keys before an insert.
    fn resolve_parents(&mut self, _conn: &Connection) -> Result<(), RepositoryError> {
        Ok(())
    }

    /// Copy fields that never change after creation from the stored row.
    fn carry_immutable(&mut self, existing: &Self);

    /// A message describing the uniqueness violation saving `self` would
    /// cause, if any. The row with `self.uuid()` is never counted.
    fn find_conflict(&self, conn: &Connection) -> Result<Option<String>, RepositoryError>;

    fn insert(&self, conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError>;

    /// Write mutable fields of a non-deleted row. Returns the rows changed.
    fn update_fields(&self, conn: &Connection) -> Result<usize, RepositoryError>;

    /// Fill parent identifiers from internal keys.
    fn hydrate(&mut self, _conn: &Connection) -> Result<(), RepositoryError> {
        Ok(())
    }
}

// ── Operations ──────────────────────────────────────────────────────────────

/// Fetch a non-deleted row by external identifier, with parent identifiers.
pub fn get_by_uuid<E: Entity>(conn: &Connection, uuid: &Uuid) -> Result<E, RepositoryError> {
    find_by_uuid(conn, uuid, false)
}

/// Like [`get_by_uuid`], optionally returning soft-deleted rows too.
pub fn find_by_uuid<E: Entity>(
    conn: &Connection,
    uuid: &Uuid,
    include_deleted: bool,
) -> Result<E, RepositoryError> {
    let started = Instant::now();
    let result = find_by_uuid_inner(conn, uuid, include_deleted);
    check_operation(&format!("{}ByUuid", E::TABLE), &result, started);
    result
}

fn find_by_uuid_inner<E: Entity>(
    conn: &Connection,
    uuid: &Uuid,
    include_deleted: bool,
) -> Result<E, RepositoryError> {
    require_identifier(uuid)?;
    let row = if include_deleted {
        conn.query_row(
            &format!("SELECT {} FROM {} WHERE uuid = ?1", E::COLUMNS, E::TABLE),
            params![uuid.to_string()],
            E::from_row,
        )
    } else {
        conn.query_row(
            &format!(
                "SELECT {} FROM {} WHERE uuid = ?1 AND deleted_state != ?2",
                E::COLUMNS,
                E::TABLE
            ),
            params![uuid.to_string(), DeletedState::SoftDeleted.as_i64()],
            E::from_row,
        )
    };
    let mut entity = row
        .optional()?
        .ok_or_else(|| RepositoryError::not_found(E::TABLE, uuid))?;
    entity.hydrate(conn)?;
    Ok(entity)
}

/// Validate, check uniqueness, insert with a fresh identifier, and return the
/// stored row.
pub fn create<E: Entity>(conn: &Connection, entity: &E) -> Result<E, RepositoryError> {
    let started = Instant::now();
    let result = create_inner(conn, entity);
    check_operation(&format!("Create{}", E::TABLE), &result, started);
    result
}

fn create_inner<E: Entity>(conn: &Connection, entity: &E) -> Result<E, RepositoryError> {
    entity.validate_create()?;

    let mut entity = entity.clone();
    entity.resolve_parents(conn)?;
    if let Some(conflict) = entity.find_conflict(conn)? {
        return Err(RepositoryError::Conflict(conflict));
    }

    let uuid = new_identifier();
    entity.insert(conn, &uuid)?;
    get_by_uuid(conn, &uuid)
}

/// Replace the mutable fields of an existing non-deleted row.
pub fn update<E: Entity>(conn: &Connection, entity: &E) -> Result<E, RepositoryError> {
    let started = Instant::now();
    let result = update_inner(conn, entity);
    check_operation(&format!("Update{}", E::TABLE), &result, started);
    result
}

fn update_inner<E: Entity>(conn: &Connection, entity: &E) -> Result<E, RepositoryError> {
    let uuid = entity.uuid();
    require_identifier(&uuid)?;
    entity.validate_update()?;

    let existing: E = get_by_uuid(conn, &uuid)?;
    let mut entity = entity.clone();
    entity.carry_immutable(&existing);
    if let Some(conflict) = entity.find_conflict(conn)? {
        return Err(RepositoryError::Conflict(conflict));
    }

    if entity.update_fields(conn)? == 0 {
        return Err(RepositoryError::not_found(E::TABLE, uuid));
    }
    get_by_uuid(conn, &uuid)
}

/// Mark a row as soft-deleted. Deleting an already deleted row is a no-op.
pub fn soft_delete<E: Entity>(conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError> {
    let started = Instant::now();
    let result = soft_delete_inner::<E>(conn, uuid);
    check_operation(&format!("SoftDelete{}", E::TABLE), &result, started);
    result
}

fn soft_delete_inner<E: Entity>(conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError> {
    require_identifier(uuid)?;
    let deleted = DeletedState::SoftDeleted.as_i64();
    let changed = conn.execute(
        &format!(
            "UPDATE {} SET deleted_state = ?1 WHERE uuid = ?2 AND deleted_state != ?1",
            E::TABLE
        ),
        params![deleted, uuid.to_string()],
    )?;
    if changed == 0 {
        let exists: bool = conn.query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE uuid = ?1)", E::TABLE),
            params![uuid.to_string()],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepositoryError::not_found(E::TABLE, uuid));
        }
    }
    Ok(())
}

// ── Row fetching ────────────────────────────────────────────────────────────

/// All rows of a table, non-deleted only unless `include_deleted`.
pub(crate) fn fetch_rows<E: Entity>(
    conn: &Connection,
    include_deleted: bool,
) -> Result<Vec<E>, RepositoryError> {
    let rows = if include_deleted {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY idx",
            E::COLUMNS,
            E::TABLE
        ))?;
        let rows = stmt.query_map([], E::from_row)?;
        rows.collect::<Result<Vec<_>, _>>()?
    } else {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE deleted_state != ?1 ORDER BY idx",
            E::COLUMNS,
            E::TABLE
        ))?;
        let rows = stmt.query_map(params![DeletedState::SoftDeleted.as_i64()], E::from_row)?;
        rows.collect::<Result<Vec<_>, _>>()?
    };
    Ok(rows)
}

/// Non-deleted rows whose `column` is one of `indexes`, ordered by key.
pub(crate) fn fetch_where_in<E: Entity>(
    conn: &Connection,
    column: &str,
    indexes: &BTreeSet<DatabaseIndex>,
) -> Result<Vec<E>, RepositoryError> {
    let keys: Vec<i64> = indexes.iter().map(|i| i.0).collect();
    let mut found = Vec::new();
    for chunk in keys.chunks(IN_LIST_CHUNK) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {column} IN ({}) AND deleted_state != {}",
            E::COLUMNS,
            E::TABLE,
            placeholders(chunk.len()),
            DeletedState::SoftDeleted.as_i64(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk), E::from_row)?;
        for row in rows {
            found.push(row?);
        }
    }
    found.sort_by_key(|e| e.index());
    Ok(found)
}

/// Non-deleted rows keyed by internal key. Missing keys are absent.
pub(crate) fn fetch_by_indexes<E: Entity>(
    conn: &Connection,
    indexes: &BTreeSet<DatabaseIndex>,
) -> Result<HashMap<DatabaseIndex, E>, RepositoryError> {
    Ok(fetch_where_in::<E>(conn, "idx", indexes)?
        .into_iter()
        .map(|e| (e.index(), e))
        .collect())
}

// ── Helpers ─────────────────────────────────────────────────────────────────

pub(crate) fn require_identifier(uuid: &Uuid) -> Result<(), RepositoryError> {
    if !is_valid_identifier(uuid) {
        return Err(IdentifierError::Nil.into());
    }
    Ok(())
}

/// Keys bound per `IN (...)` list; stays under SQLite's host parameter limit.
pub(crate) const IN_LIST_CHUNK: usize = 500;

/// `?, ?, ?` for `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Log an operation's outcome and elapsed time.
pub(crate) fn check_operation<T>(
    op: &str,
    result: &Result<T, RepositoryError>,
    started: Instant,
) {
    let spent = started.elapsed();
    match result {
        Err(e) if !e.is_client_error() => log::warn!("[sqlite] DB.{op} error: {e} ({spent:?})"),
        Err(e) => log::debug!("[sqlite] DB.{op} rejected: {e} ({spent:?})"),
        Ok(_) => log::debug!("[sqlite] DB.{op} {spent:?}"),
    }
}

pub(crate) fn column_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn column_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn column_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    parse_timestamp(&text).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn column_optional_timestamp(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| parse_timestamp(&t).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// Timestamps are stored as `strftime('%Y-%m-%d %H:%M:%f')` in UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.and_utc())
}

fn conversion_error<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn placeholders_for_in_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn in_lists_larger_than_parameter_limit_are_chunked() {
        use earth_catalog::{Continent, ContinentType, UserMinimal};

        let conn = crate::open_memory().unwrap();
        let creator = UserMinimal {
            email: "a@b.com".to_string(),
            name: "A".to_string(),
        };
        let mut expected = Vec::new();
        for t in [ContinentType::Europe, ContinentType::Asia] {
            let continent = Continent::new(t.display_name(), t, 1.0, creator.clone());
            expected.push(create(&conn, &continent).unwrap().index);
        }

        let wanted: BTreeSet<DatabaseIndex> = (1..=40_000).map(DatabaseIndex).collect();
        let found = fetch_where_in::<Continent>(&conn, "idx", &wanted).unwrap();
        let found: Vec<DatabaseIndex> = found.iter().map(|c| c.index).collect();
        assert_eq!(found, expected);
        assert!(fetch_where_in::<Continent>(&conn, "idx", &BTreeSet::new()).unwrap().is_empty());
    }

    #[test]
    fn stored_timestamps_parse_as_utc() {
        let ts = parse_timestamp("2024-03-01 12:34:56.789").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.timestamp_subsec_millis(), 789);
        assert!(parse_timestamp("yesterday").is_err());
    }
}
