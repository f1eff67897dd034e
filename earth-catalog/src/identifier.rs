//! External identifier codec.
//!
//! Every entity is addressed from the outside by a random v4 UUID. The nil
//! UUID is never a valid identifier; it is what a request body deserializes
//! to when the `uuid` field is absent.

use uuid::Uuid;

use crate::error::IdentifierError;

/// Generate a fresh random identifier.
pub fn new_identifier() -> Uuid {
    Uuid::new_v4()
}

/// Parse an identifier from its textual form.
///
/// Fails on empty input, on anything `uuid` cannot decode, and on the nil
/// identifier.
pub fn parse_identifier(value: &str) -> Result<Uuid, IdentifierError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(IdentifierError::Empty);
    }
    let uuid = Uuid::parse_str(value).map_err(|e| IdentifierError::Malformed {
        value: value.to_string(),
        reason: e.to_string(),
    })?;
    if uuid.is_nil() {
        return Err(IdentifierError::Nil);
    }
    Ok(uuid)
}

/// `false` for the nil identifier.
pub fn is_valid_identifier(uuid: &Uuid) -> bool {
    !uuid.is_nil()
}

/// Parse a comma-separated identifier list, skipping empty segments.
pub fn parse_identifier_list(value: &str) -> Result<Vec<Uuid>, IdentifierError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_identifier)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identifiers_differ() {
        let a = new_identifier();
        let b = new_identifier();
        assert_ne!(a, b);
        assert!(is_valid_identifier(&a));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let id = new_identifier();
        let parsed = parse_identifier(&format!("  {id} ")).unwrap();
        assert_eq!(parsed, id);
    }
}
