//! Translation between external identifiers and internal keys.
//!
//! Only non-deleted rows resolve. A deleted row's identifier is therefore
//! unusable as a parent reference even though the row still exists.

use std::collections::{BTreeSet, HashMap};

use earth_catalog::{DatabaseIndex, DeletedState};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::repository::{
    Entity, IN_LIST_CHUNK, RepositoryError, placeholders, require_identifier,
};

/// Internal key of the non-deleted `E` row with this identifier.
pub fn resolve_index<E: Entity>(
    conn: &Connection,
    uuid: &Uuid,
) -> Result<DatabaseIndex, RepositoryError> {
    require_identifier(uuid)?;
    conn.query_row(
        &format!(
            "SELECT idx FROM {} WHERE uuid = ?1 AND deleted_state != ?2",
            E::TABLE
        ),
        params![uuid.to_string(), DeletedState::SoftDeleted.as_i64()],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .map(DatabaseIndex)
    .ok_or_else(|| RepositoryError::not_found(E::TABLE, uuid))
}

/// External identifier of the non-deleted `E` row with this internal key.
pub fn resolve_identifier<E: Entity>(
    conn: &Connection,
    index: DatabaseIndex,
) -> Result<Uuid, RepositoryError> {
    if !index.is_valid() {
        return Err(RepositoryError::InvalidIndex(index.to_string()));
    }
    let text: Option<String> = conn
        .query_row(
            &format!(
                "SELECT uuid FROM {} WHERE idx = ?1 AND deleted_state != ?2",
                E::TABLE
            ),
            params![index.0, DeletedState::SoftDeleted.as_i64()],
            |row| row.get(0),
        )
        .optional()?;
    let text = text.ok_or_else(|| RepositoryError::not_found(E::TABLE, index))?;
    Uuid::parse_str(&text).map_err(|e| RepositoryError::InvalidIdentifier(e.to_string()))
}

/// Identifiers for many internal keys, queried in chunks of `IN_LIST_CHUNK` keys.
///
/// Keys that do not resolve (missing, deleted, or not positive) are absent
/// from the result. An empty key set is an error.
pub fn resolve_identifiers_bulk<E: Entity>(
    conn: &Connection,
    indexes: &BTreeSet<DatabaseIndex>,
) -> Result<HashMap<DatabaseIndex, Uuid>, RepositoryError> {
    if indexes.is_empty() {
        return Err(RepositoryError::InvalidIndex("empty index set".to_string()));
    }
    let wanted: Vec<i64> = indexes
        .iter()
        .filter(|i| i.is_valid())
        .map(|i| i.0)
        .collect();
    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let mut resolved = HashMap::with_capacity(wanted.len());
    for chunk in wanted.chunks(IN_LIST_CHUNK) {
        let sql = format!(
            "SELECT idx, uuid FROM {} WHERE idx IN ({}) AND deleted_state != {}",
            E::TABLE,
            placeholders(chunk.len()),
            DeletedState::SoftDeleted.as_i64(),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (idx, text) = row?;
            let uuid = Uuid::parse_str(&text)
                .map_err(|e| RepositoryError::InvalidIdentifier(e.to_string()))?;
            resolved.insert(DatabaseIndex(idx), uuid);
        }
    }
    Ok(resolved)
}
