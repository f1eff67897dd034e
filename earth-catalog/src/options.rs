//! Listing options and their query-string encoding.
//!
//! Booleans are truthy for `true` or `1` (case-insensitive) and fall back to
//! their default when the key is absent. Lists are comma-separated; empty
//! segments are ignored.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::OptionsError;
use crate::identifier::parse_identifier_list;
use crate::types::ContinentType;

/// Options for listing continents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinentQueryOptions {
    /// Attach the countries of each continent.
    pub with_countries: bool,
    /// Attach the cities of each continent.
    pub with_cities: bool,
    /// Continent types to keep. Empty keeps all.
    pub types: Vec<ContinentType>,
    /// Continent identifiers to keep. Empty keeps all.
    pub uuids: Vec<Uuid>,
    pub include_deleted: bool,
}

/// Options for listing countries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryQueryOptions {
    /// Attach a snapshot of the parent continent.
    pub with_continent: bool,
    /// Attach the cities of each country.
    pub with_cities: bool,
    pub continent_types: Vec<ContinentType>,
    /// Parent continents to keep. Empty keeps all.
    pub continent_uuids: Vec<Uuid>,
    /// Country identifiers to keep. Empty keeps all.
    pub uuids: Vec<Uuid>,
    pub include_deleted: bool,
}

/// Options for listing cities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityQueryOptions {
    /// Attach a snapshot of the parent country.
    pub with_country: bool,
    /// Attach a snapshot of the continent.
    pub with_continent: bool,
    pub continent_types: Vec<ContinentType>,
    /// Parent countries to keep. Empty keeps all.
    pub country_uuids: Vec<Uuid>,
    /// City identifiers to keep. Empty keeps all.
    pub uuids: Vec<Uuid>,
    pub include_deleted: bool,
}

impl ContinentQueryOptions {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, OptionsError> {
        Ok(Self {
            with_countries: query_bool(query, "with_countries", false),
            with_cities: query_bool(query, "with_cities", false),
            types: query_continent_types(query, "types")?,
            uuids: query_identifiers(query, "uuids")?,
            include_deleted: query_bool(query, "deleted", false),
        })
    }
}

impl CountryQueryOptions {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, OptionsError> {
        Ok(Self {
            with_continent: query_bool(query, "with_continent", false),
            with_cities: query_bool(query, "with_cities", false),
            continent_types: query_continent_types(query, "continent_types")?,
            continent_uuids: query_identifiers(query, "continent_uuids")?,
            uuids: query_identifiers(query, "uuids")?,
            include_deleted: query_bool(query, "deleted", false),
        })
    }
}

impl CityQueryOptions {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, OptionsError> {
        Ok(Self {
            with_country: query_bool(query, "with_country", false),
            with_continent: query_bool(query, "with_continent", false),
            continent_types: query_continent_types(query, "continent_types")?,
            country_uuids: query_identifiers(query, "country_uuids")?,
            uuids: query_identifiers(query, "uuids")?,
            include_deleted: query_bool(query, "deleted", false),
        })
    }
}

// ── Query-string helpers ────────────────────────────────────────────────────

/// `true`/`1` (any case) is true, anything else false, absent is `default`.
pub fn query_bool(query: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match query.get(key).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => v.eq_ignore_ascii_case("true") || v == "1",
        _ => default,
    }
}

/// Comma-separated values for `key`, trimmed, with empty segments dropped.
pub fn query_list<'a>(query: &'a HashMap<String, String>, key: &str) -> Vec<&'a str> {
    query
        .get(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

pub fn query_int_list(query: &HashMap<String, String>, key: &str) -> Result<Vec<i64>, OptionsError> {
    query_list(query, key)
        .into_iter()
        .map(|v| {
            v.parse::<i64>().map_err(|_| OptionsError::Integer {
                key: key.to_string(),
                value: v.to_string(),
            })
        })
        .collect()
}

fn query_continent_types(
    query: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<ContinentType>, OptionsError> {
    let mut types = Vec::new();
    for code in query_int_list(query, key)? {
        let t = ContinentType::from_code(code).ok_or_else(|| OptionsError::ContinentType {
            key: key.to_string(),
            value: code,
        })?;
        if !types.contains(&t) {
            types.push(t);
        }
    }
    Ok(types)
}

fn query_identifiers(query: &HashMap<String, String>, key: &str) -> Result<Vec<Uuid>, OptionsError> {
    match query.get(key) {
        Some(v) => parse_identifier_list(v).map_err(|source| OptionsError::Identifier {
            key: key.to_string(),
            source,
        }),
        None => Ok(Vec::new()),
    }
}
