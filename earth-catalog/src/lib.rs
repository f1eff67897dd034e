//! Earth catalog data model, identifier codec, and listing options.
//!
//! This crate defines the continent/country/city model without any database
//! dependencies. `earth-db` persists these types and `earth-server` puts them
//! on the wire.

pub mod error;
pub mod identifier;
pub mod options;
pub mod types;

pub use error::{IdentifierError, OptionsError, ValidationError};
pub use identifier::{is_valid_identifier, new_identifier, parse_identifier, parse_identifier_list};
pub use options::{CityQueryOptions, ContinentQueryOptions, CountryQueryOptions};
pub use types::*;
