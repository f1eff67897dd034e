//! Continent rows and the continent listing.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use earth_catalog::{
    City, Continent, ContinentDetails, ContinentQueryOptions, ContinentType, Country,
    DatabaseIndex, DeletedState, ValidationError,
};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::filter::ParentFilter;
use crate::repository::{
    Entity, RepositoryError, check_operation, column_json, column_optional_timestamp,
    column_timestamp, column_uuid, fetch_rows, fetch_where_in,
};
use crate::resolver::resolve_identifiers_bulk;

impl Entity for Continent {
    const TABLE: &'static str = "continent";
    const COLUMNS: &'static str =
        "idx, uuid, name, type, area_by_km2, creator, created, updated, deleted_state";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let code: i64 = row.get(3)?;
        let continent_type = ContinentType::from_code(code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Integer,
                format!("unknown continent type {code}").into(),
            )
        })?;
        Ok(Continent {
            index: DatabaseIndex(row.get(0)?),
            uuid: column_uuid(row, 1)?,
            name: row.get(2)?,
            continent_type,
            area_by_km2: row.get(4)?,
            details: None,
            creator: column_json(row, 5)?,
            created: column_timestamp(row, 6)?,
            updated: column_optional_timestamp(row, 7)?,
            deleted_state: DeletedState::from_i64(row.get(8)?),
        })
    }

    fn index(&self) -> DatabaseIndex {
        self.index
    }

    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn validate_create(&self) -> Result<(), ValidationError> {
        Continent::validate_create(self)
    }

    fn validate_update(&self) -> Result<(), ValidationError> {
        Continent::validate_update(self)
    }

    fn carry_immutable(&mut self, existing: &Self) {
        self.index = existing.index;
        self.creator = existing.creator.clone();
        self.created = existing.created;
    }

    /// At most one live continent per type.
    fn find_conflict(&self, conn: &Connection) -> Result<Option<String>, RepositoryError> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM continent
             WHERE type = ?1 AND deleted_state != ?2 AND uuid != ?3)",
            params![
                self.continent_type.code(),
                DeletedState::SoftDeleted.as_i64(),
                self.uuid.to_string(),
            ],
            |row| row.get(0),
        )?;
        Ok(taken.then(|| format!("continent with type {} already exists", self.continent_type.code())))
    }

    fn insert(&self, conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError> {
        conn.execute(
            "INSERT INTO continent (uuid, name, type, area_by_km2, creator)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid.to_string(),
                self.name.trim(),
                self.continent_type.code(),
                self.area_by_km2,
                serde_json::to_string(&self.creator)?,
            ],
        )?;
        Ok(())
    }

    fn update_fields(&self, conn: &Connection) -> Result<usize, RepositoryError> {
        Ok(conn.execute(
            "UPDATE continent SET name = ?1, type = ?2, area_by_km2 = ?3
             WHERE uuid = ?4 AND deleted_state != ?5",
            params![
                self.name.trim(),
                self.continent_type.code(),
                self.area_by_km2,
                self.uuid.to_string(),
                DeletedState::SoftDeleted.as_i64(),
            ],
        )?)
    }
}

/// List continents, optionally with their countries and cities attached.
///
/// Child lists only contain non-deleted rows whose parents still resolve.
pub fn list_continents(
    conn: &Connection,
    options: &ContinentQueryOptions,
) -> Result<Vec<Continent>, RepositoryError> {
    let started = Instant::now();
    let result = list_continents_inner(conn, options);
    check_operation("Continents", &result, started);
    result
}

fn list_continents_inner(
    conn: &Connection,
    options: &ContinentQueryOptions,
) -> Result<Vec<Continent>, RepositoryError> {
    let filter = ParentFilter::new(&options.types, &[], &options.uuids);
    let mut continents: Vec<Continent> = fetch_rows::<Continent>(conn, options.include_deleted)?
        .into_iter()
        .filter(|c| filter.accepts(c.continent_type, &Uuid::nil(), &c.uuid))
        .collect();

    if continents.is_empty() || !(options.with_countries || options.with_cities) {
        return Ok(continents);
    }

    let continent_uuids: HashMap<DatabaseIndex, Uuid> =
        continents.iter().map(|c| (c.index, c.uuid)).collect();
    let indexes: BTreeSet<DatabaseIndex> = continent_uuids.keys().copied().collect();

    let mut countries_by_continent: HashMap<DatabaseIndex, Vec<Country>> = HashMap::new();
    if options.with_countries {
        for mut country in fetch_where_in::<Country>(conn, "continent_idx", &indexes)? {
            country.continent_uuid = continent_uuids[&country.continent_index];
            countries_by_continent
                .entry(country.continent_index)
                .or_default()
                .push(country);
        }
    }

    let mut cities_by_continent: HashMap<DatabaseIndex, Vec<City>> = HashMap::new();
    if options.with_cities {
        let cities = fetch_where_in::<City>(conn, "continent_idx", &indexes)?;
        let country_indexes: BTreeSet<DatabaseIndex> =
            cities.iter().map(|c| c.country_index).collect();
        let country_uuids = if country_indexes.is_empty() {
            HashMap::new()
        } else {
            resolve_identifiers_bulk::<Country>(conn, &country_indexes)?
        };
        for mut city in cities {
            let Some(country_uuid) = country_uuids.get(&city.country_index) else {
                log::debug!("[sqlite] dropping city {} with unresolved country", city.uuid);
                continue;
            };
            city.country_uuid = *country_uuid;
            city.continent_uuid = continent_uuids[&city.continent_index];
            cities_by_continent
                .entry(city.continent_index)
                .or_default()
                .push(city);
        }
    }

    for continent in &mut continents {
        continent.details = Some(ContinentDetails {
            countries: options
                .with_countries
                .then(|| countries_by_continent.remove(&continent.index).unwrap_or_default()),
            cities: options
                .with_cities
                .then(|| cities_by_continent.remove(&continent.index).unwrap_or_default()),
        });
    }
    Ok(continents)
}
