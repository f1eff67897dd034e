//! City rows and the city listing.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use earth_catalog::{
    City, CityDetails, CityQueryOptions, Continent, Country, DatabaseIndex, DeletedState,
    ValidationError,
};
use rusqlite::{Connection, Row, params};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::filter::ParentFilter;
use crate::repository::{
    Entity, RepositoryError, check_operation, column_json, column_optional_timestamp,
    column_timestamp, column_uuid, fetch_by_indexes, fetch_rows,
};
use crate::resolver::{resolve_identifier, resolve_identifiers_bulk, resolve_index};

/// Persisted subset of [`CityDetails`].
#[derive(Deserialize)]
struct StoredCityDetails {
    #[serde(default)]
    is_capital: bool,
}

impl Entity for City {
    const TABLE: &'static str = "city";
    const COLUMNS: &'static str = "idx, continent_idx, country_idx, uuid, name, details, creator, \
                                   created, updated, deleted_state";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stored: StoredCityDetails = column_json(row, 5)?;
        Ok(City {
            index: DatabaseIndex(row.get(0)?),
            continent_index: DatabaseIndex(row.get(1)?),
            country_index: DatabaseIndex(row.get(2)?),
            continent_uuid: Uuid::nil(),
            country_uuid: Uuid::nil(),
            uuid: column_uuid(row, 3)?,
            name: row.get(4)?,
            details: CityDetails {
                is_capital: stored.is_capital,
                ..CityDetails::default()
            },
            creator: column_json(row, 6)?,
            created: column_timestamp(row, 7)?,
            updated: column_optional_timestamp(row, 8)?,
            deleted_state: DeletedState::from_i64(row.get(9)?),
        })
    }

    fn index(&self) -> DatabaseIndex {
        self.index
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn validate_create(&self) -> Result<(), ValidationError> {
        City::validate_create(self)
    }

    fn validate_update(&self) -> Result<(), ValidationError> {
        City::validate_update(self)
    }

    /// Resolve both parents and check the country sits on the continent.
    fn resolve_parents(&mut self, conn: &Connection) -> Result<(), RepositoryError> {
        self.continent_index = resolve_index::<Continent>(conn, &self.continent_uuid)?;
        self.country_index = resolve_index::<Country>(conn, &self.country_uuid)?;

        let country_continent: i64 = conn.query_row(
            "SELECT continent_idx FROM country WHERE idx = ?1",
            params![self.country_index.0],
            |row| row.get(0),
        )?;
        if DatabaseIndex(country_continent) != self.continent_index {
            return Err(ValidationError::new(format!(
                "country {} does not belong to continent {}",
                self.country_uuid, self.continent_uuid
            ))
            .into());
        }
        Ok(())
    }

    fn carry_immutable(&mut self, existing: &Self) {
        self.index = existing.index;
        self.continent_index = existing.continent_index;
        self.country_index = existing.country_index;
        self.continent_uuid = existing.continent_uuid;
        self.country_uuid = existing.country_uuid;
        self.creator = existing.creator.clone();
        self.created = existing.created;
    }

    /// A country has at most one live capital.
    fn find_conflict(&self, conn: &Connection) -> Result<Option<String>, RepositoryError> {
        if !self.is_capital() {
            return Ok(None);
        }
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM city
             WHERE country_idx = ?1 AND json_extract(details, '$.is_capital') = 1
               AND deleted_state != ?2 AND uuid != ?3)",
            params![
                self.country_index.0,
                DeletedState::SoftDeleted.as_i64(),
                self.uuid.to_string(),
            ],
            |row| row.get(0),
        )?;
        Ok(taken.then(|| format!("country {} already has a capital", self.country_uuid)))
    }

    fn insert(&self, conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError> {
        conn.execute(
            "INSERT INTO city (continent_idx, country_idx, uuid, name, details, creator)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.continent_index.0,
                self.country_index.0,
                uuid.to_string(),
                self.name.trim(),
                stored_details(&self.details).to_string(),
                serde_json::to_string(&self.creator)?,
            ],
        )?;
        Ok(())
    }

    fn update_fields(&self, conn: &Connection) -> Result<usize, RepositoryError> {
        Ok(conn.execute(
            "UPDATE city SET name = ?1, details = ?2
             WHERE uuid = ?3 AND deleted_state != ?4",
            params![
                self.name.trim(),
                stored_details(&self.details).to_string(),
                self.uuid.to_string(),
                DeletedState::SoftDeleted.as_i64(),
            ],
        )?)
    }

    fn hydrate(&mut self, conn: &Connection) -> Result<(), RepositoryError> {
        self.continent_uuid = resolve_identifier::<Continent>(conn, self.continent_index)?;
        self.country_uuid = resolve_identifier::<Country>(conn, self.country_index)?;
        Ok(())
    }
}

fn stored_details(details: &CityDetails) -> serde_json::Value {
    json!({ "is_capital": details.is_capital })
}

/// List cities. Cities whose country or continent no longer resolves are
/// left out.
pub fn list_cities(
    conn: &Connection,
    options: &CityQueryOptions,
) -> Result<Vec<City>, RepositoryError> {
    let started = Instant::now();
    let result = list_cities_inner(conn, options);
    check_operation("Cities", &result, started);
    result
}

fn list_cities_inner(
    conn: &Connection,
    options: &CityQueryOptions,
) -> Result<Vec<City>, RepositoryError> {
    let rows = fetch_rows::<City>(conn, options.include_deleted)?;
    if rows.is_empty() {
        return Ok(rows);
    }

    let continent_indexes: BTreeSet<DatabaseIndex> =
        rows.iter().map(|c| c.continent_index).collect();
    let country_indexes: BTreeSet<DatabaseIndex> = rows.iter().map(|c| c.country_index).collect();
    let continents = fetch_by_indexes::<Continent>(conn, &continent_indexes)?;

    // Full country rows only when a snapshot is wanted; identifiers otherwise.
    let mut country_rows: HashMap<DatabaseIndex, Country> = HashMap::new();
    let country_uuids: HashMap<DatabaseIndex, Uuid> = if options.with_country {
        country_rows = fetch_by_indexes::<Country>(conn, &country_indexes)?;
        country_rows.iter().map(|(idx, c)| (*idx, c.uuid)).collect()
    } else {
        resolve_identifiers_bulk::<Country>(conn, &country_indexes)?
    };

    let filter = ParentFilter::new(
        &options.continent_types,
        &options.country_uuids,
        &options.uuids,
    );

    let mut cities = Vec::with_capacity(rows.len());
    for mut city in rows {
        let (Some(continent), Some(country_uuid)) = (
            continents.get(&city.continent_index),
            country_uuids.get(&city.country_index),
        ) else {
            log::debug!("[sqlite] dropping city {} with unresolved parent", city.uuid);
            continue;
        };
        if !filter.accepts(continent.continent_type, country_uuid, &city.uuid) {
            continue;
        }
        city.continent_uuid = continent.uuid;
        city.country_uuid = *country_uuid;

        if let Some(country) = country_rows.get(&city.country_index) {
            let mut country = country.clone();
            country.continent_uuid = continents
                .get(&country.continent_index)
                .map(|c| c.uuid)
                .unwrap_or_default();
            city.details.country = Some(Box::new(country));
        }
        if options.with_continent {
            city.details.continent = Some(Box::new(continent.clone()));
        }
        cities.push(city);
    }
    Ok(cities)
}
