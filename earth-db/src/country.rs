//! Country rows and the country listing.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use earth_catalog::{
    City, Continent, Country, CountryDetails, CountryQueryOptions, DatabaseIndex, DeletedState,
    ValidationError,
};
use rusqlite::{Connection, Row, params};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::filter::ParentFilter;
use crate::repository::{
    Entity, RepositoryError, check_operation, column_json, column_optional_timestamp,
    column_timestamp, column_uuid, fetch_by_indexes, fetch_rows, fetch_where_in,
};
use crate::resolver::{resolve_identifier, resolve_index};

/// Persisted subset of [`CountryDetails`].
#[derive(Deserialize)]
struct StoredCountryDetails {
    phone_code: String,
    iso_code: String,
    currency: String,
}

impl Entity for Country {
    const TABLE: &'static str = "country";
    const COLUMNS: &'static str =
        "idx, continent_idx, uuid, name, details, creator, created, updated, deleted_state";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let stored: StoredCountryDetails = column_json(row, 4)?;
        Ok(Country {
            index: DatabaseIndex(row.get(0)?),
            continent_index: DatabaseIndex(row.get(1)?),
            continent_uuid: Uuid::nil(),
            uuid: column_uuid(row, 2)?,
            name: row.get(3)?,
            details: CountryDetails::new(stored.phone_code, stored.iso_code, stored.currency),
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
        Country::validate_create(self)
    }

    fn validate_update(&self) -> Result<(), ValidationError> {
        Country::validate_update(self)
    }

    fn resolve_parents(&mut self, conn: &Connection) -> Result<(), RepositoryError> {
        self.continent_index = resolve_index::<Continent>(conn, &self.continent_uuid)?;
        Ok(())
    }

    fn carry_immutable(&mut self, existing: &Self) {
        self.index = existing.index;
        self.continent_index = existing.continent_index;
        self.continent_uuid = existing.continent_uuid;
        self.creator = existing.creator.clone();
        self.created = existing.created;
    }

    /// A phone code and ISO code pair identifies one live country.
    fn find_conflict(&self, conn: &Connection) -> Result<Option<String>, RepositoryError> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM country
             WHERE json_extract(details, '$.phone_code') = ?1
               AND json_extract(details, '$.iso_code') = ?2
               AND deleted_state != ?3 AND uuid != ?4)",
            params![
                self.details.phone_code.trim(),
                self.details.iso_code.trim(),
                DeletedState::SoftDeleted.as_i64(),
                self.uuid.to_string(),
            ],
            |row| row.get(0),
        )?;
        Ok(taken.then(|| {
            format!(
                "country with phone code {} and iso code {} already exists",
                self.details.phone_code.trim(),
                self.details.iso_code.trim()
            )
        }))
    }

    fn insert(&self, conn: &Connection, uuid: &Uuid) -> Result<(), RepositoryError> {
        conn.execute(
            "INSERT INTO country (continent_idx, uuid, name, details, creator)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.continent_index.0,
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
            "UPDATE country SET name = ?1, details = ?2
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
        Ok(())
    }
}

fn stored_details(details: &CountryDetails) -> serde_json::Value {
    json!({
        "phone_code": details.phone_code.trim(),
        "iso_code": details.iso_code.trim(),
        "currency": details.currency.trim(),
    })
}

/// List countries. Countries whose continent no longer resolves are left out.
pub fn list_countries(
    conn: &Connection,
    options: &CountryQueryOptions,
) -> Result<Vec<Country>, RepositoryError> {
    let started = Instant::now();
    let result = list_countries_inner(conn, options);
    check_operation("Countries", &result, started);
    result
}

fn list_countries_inner(
    conn: &Connection,
    options: &CountryQueryOptions,
) -> Result<Vec<Country>, RepositoryError> {
    let rows = fetch_rows::<Country>(conn, options.include_deleted)?;
    if rows.is_empty() {
        return Ok(rows);
    }

    let continent_indexes: BTreeSet<DatabaseIndex> =
        rows.iter().map(|c| c.continent_index).collect();
    let continents = fetch_by_indexes::<Continent>(conn, &continent_indexes)?;
    let filter = ParentFilter::new(
        &options.continent_types,
        &options.continent_uuids,
        &options.uuids,
    );

    let mut countries = Vec::with_capacity(rows.len());
    for mut country in rows {
        let Some(continent) = continents.get(&country.continent_index) else {
            log::debug!("[sqlite] dropping country {} with unresolved continent", country.uuid);
            continue;
        };
        if !filter.accepts(continent.continent_type, &continent.uuid, &country.uuid) {
            continue;
        }
        country.continent_uuid = continent.uuid;
        if options.with_continent {
            country.details.continent = Some(Box::new(continent.clone()));
        }
        countries.push(country);
    }

    if options.with_cities {
        attach_cities(conn, &mut countries, &continents)?;
    }
    Ok(countries)
}

fn attach_cities(
    conn: &Connection,
    countries: &mut [Country],
    continents: &HashMap<DatabaseIndex, Continent>,
) -> Result<(), RepositoryError> {
    let indexes: BTreeSet<DatabaseIndex> = countries.iter().map(|c| c.index).collect();
    let mut by_country: HashMap<DatabaseIndex, Vec<City>> = HashMap::new();
    for mut city in fetch_where_in::<City>(conn, "country_idx", &indexes)? {
        let Some(continent) = continents.get(&city.continent_index) else {
            log::debug!("[sqlite] dropping city {} with unresolved continent", city.uuid);
            continue;
        };
        city.continent_uuid = continent.uuid;
        by_country.entry(city.country_index).or_default().push(city);
    }

    for country in countries {
        let mut cities = by_country.remove(&country.index).unwrap_or_default();
        for city in &mut cities {
            city.country_uuid = country.uuid;
        }
        country.details.cities = Some(cities);
    }
    Ok(())
}
