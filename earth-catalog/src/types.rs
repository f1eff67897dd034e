//! Data model types for the earth catalog.
//!
//! These types represent both the persistent rows (continent, country, city)
//! and their wire shape. Internal keys and deleted state are never
//! serialized; parent identifiers are resolved from internal keys on every
//! read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::identifier::is_valid_identifier;

// ── Store primitives ────────────────────────────────────────────────────────

/// Internal relational key assigned by the store. Never exposed externally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseIndex(pub i64);

impl DatabaseIndex {
    /// Keys are strictly positive; zero means "not assigned yet".
    pub fn is_valid(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for DatabaseIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Soft-delete state of a row. Rows are never physically removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedState {
    #[default]
    NotDeleted,
    SoftDeleted,
}

impl DeletedState {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::NotDeleted => 0,
            Self::SoftDeleted => 1,
        }
    }

    /// Any non-zero value in the column counts as deleted.
    pub fn from_i64(value: i64) -> Self {
        if value == 0 {
            Self::NotDeleted
        } else {
            Self::SoftDeleted
        }
    }

    pub fn is_deleted(self) -> bool {
        self == Self::SoftDeleted
    }
}

/// Minimal record of the user who created an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMinimal {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl UserMinimal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::new("Invalid creator email"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("Invalid creator name"));
        }
        Ok(())
    }
}

fn require_creator(creator: Option<&UserMinimal>, entity: &str) -> Result<(), ValidationError> {
    match creator {
        Some(c) => c.validate(),
        None => Err(ValidationError::new(format!("Empty {entity} creator"))),
    }
}

fn require_name(name: &str, entity: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(format!("Invalid {entity} name")));
    }
    Ok(())
}

// ── Continent ───────────────────────────────────────────────────────────────

/// The seven continents. Serialized as its integer code (1..=7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ContinentType {
    Asia,
    Africa,
    Europe,
    NorthAmerica,
    SouthAmerica,
    Oceania,
    Antarctica,
}

impl ContinentType {
    pub const ALL: [ContinentType; 7] = [
        Self::Asia,
        Self::Africa,
        Self::Europe,
        Self::NorthAmerica,
        Self::SouthAmerica,
        Self::Oceania,
        Self::Antarctica,
    ];

    pub fn code(self) -> i64 {
        match self {
            Self::Asia => 1,
            Self::Africa => 2,
            Self::Europe => 3,
            Self::NorthAmerica => 4,
            Self::SouthAmerica => 5,
            Self::Oceania => 6,
            Self::Antarctica => 7,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Asia => "Asia",
            Self::Africa => "Africa",
            Self::Europe => "Europe",
            Self::NorthAmerica => "North America",
            Self::SouthAmerica => "South America",
            Self::Oceania => "Oceania",
            Self::Antarctica => "Antarctica",
        }
    }
}

impl TryFrom<i64> for ContinentType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("unknown continent type {code}"))
    }
}

impl From<ContinentType> for i64 {
    fn from(t: ContinentType) -> i64 {
        t.code()
    }
}

impl fmt::Display for ContinentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    #[serde(skip)]
    pub index: DatabaseIndex,
    #[serde(default)]
    pub uuid: Uuid,

    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub continent_type: ContinentType,
    #[serde(default)]
    pub area_by_km2: f64,

    /// Child lists, only filled when a listing asks for them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ContinentDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub deleted_state: DeletedState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<Country>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<City>>,
}

impl Continent {
    /// A new, unsaved continent.
    pub fn new(
        name: impl Into<String>,
        continent_type: ContinentType,
        area_by_km2: f64,
        creator: UserMinimal,
    ) -> Self {
        Self {
            index: DatabaseIndex::default(),
            uuid: Uuid::nil(),
            name: name.into(),
            continent_type,
            area_by_km2,
            details: None,
            creator: Some(creator),
            created: DateTime::<Utc>::default(),
            updated: None,
            deleted_state: DeletedState::NotDeleted,
        }
    }

    pub fn validate_create(&self) -> Result<(), ValidationError> {
        self.validate_fields()?;
        require_creator(self.creator.as_ref(), "continent")
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        self.validate_fields()
    }

    fn validate_fields(&self) -> Result<(), ValidationError> {
        require_name(&self.name, "continent")?;
        if !(self.area_by_km2.is_finite() && self.area_by_km2 > 0.0) {
            return Err(ValidationError::new("Invalid continent area_by_km2"));
        }
        Ok(())
    }
}

// ── Country ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(skip)]
    pub index: DatabaseIndex,
    #[serde(skip)]
    pub continent_index: DatabaseIndex,

    #[serde(default)]
    pub continent_uuid: Uuid,
    #[serde(default)]
    pub uuid: Uuid,

    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: CountryDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub deleted_state: DeletedState,
}

/// Country details. Only the code fields are persisted; `continent` and
/// `cities` are hydration snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryDetails {
    #[serde(default)]
    pub phone_code: String,
    #[serde(default)]
    pub iso_code: String,
    #[serde(default)]
    pub currency: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Box<Continent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<City>>,
}

impl CountryDetails {
    pub fn new(
        phone_code: impl Into<String>,
        iso_code: impl Into<String>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            phone_code: phone_code.into(),
            iso_code: iso_code.into(),
            currency: currency.into(),
            continent: None,
            cities: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.phone_code.trim().is_empty() {
            return Err(ValidationError::new("Invalid country phone code"));
        }
        if self.iso_code.trim().is_empty() {
            return Err(ValidationError::new("Invalid country iso code"));
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::new("Invalid country currency"));
        }
        Ok(())
    }
}

impl Country {
    /// A new, unsaved country under the continent identified by `continent_uuid`.
    pub fn new(
        continent_uuid: Uuid,
        name: impl Into<String>,
        details: CountryDetails,
        creator: UserMinimal,
    ) -> Self {
        Self {
            continent_uuid,
            name: name.into(),
            details,
            creator: Some(creator),
            ..Self::default()
        }
    }

    pub fn validate_create(&self) -> Result<(), ValidationError> {
        if !is_valid_identifier(&self.continent_uuid) {
            return Err(ValidationError::new("Invalid continent uuid"));
        }
        self.validate_update()?;
        require_creator(self.creator.as_ref(), "country")
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        require_name(&self.name, "country")?;
        self.details.validate()
    }
}

// ── City ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(skip)]
    pub index: DatabaseIndex,
    #[serde(skip)]
    pub continent_index: DatabaseIndex,
    #[serde(skip)]
    pub country_index: DatabaseIndex,

    #[serde(default)]
    pub continent_uuid: Uuid,
    #[serde(default)]
    pub country_uuid: Uuid,
    #[serde(default)]
    pub uuid: Uuid,

    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: CityDetails,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,
    #[serde(default)]
    pub created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub deleted_state: DeletedState,
}

/// City details. Only `is_capital` is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityDetails {
    #[serde(default)]
    pub is_capital: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Box<Country>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Box<Continent>>,
}

impl City {
    /// A new, unsaved city under the given country and continent.
    pub fn new(
        continent_uuid: Uuid,
        country_uuid: Uuid,
        name: impl Into<String>,
        is_capital: bool,
        creator: UserMinimal,
    ) -> Self {
        Self {
            continent_uuid,
            country_uuid,
            name: name.into(),
            details: CityDetails {
                is_capital,
                ..CityDetails::default()
            },
            creator: Some(creator),
            ..Self::default()
        }
    }

    pub fn validate_create(&self) -> Result<(), ValidationError> {
        if !is_valid_identifier(&self.continent_uuid) {
            return Err(ValidationError::new("Invalid continent uuid"));
        }
        if !is_valid_identifier(&self.country_uuid) {
            return Err(ValidationError::new("Invalid country uuid"));
        }
        self.validate_update()?;
        require_creator(self.creator.as_ref(), "city")
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        require_name(&self.name, "city")
    }

    pub fn is_capital(&self) -> bool {
        self.details.is_capital
    }
}
