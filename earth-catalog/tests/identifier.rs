use earth_catalog::*;

#[test]
fn parse_roundtrips_generated_identifier() {
    let id = new_identifier();
    assert_eq!(parse_identifier(&id.to_string()).unwrap(), id);
}

#[test]
fn empty_identifier_is_rejected() {
    assert_eq!(parse_identifier(""), Err(IdentifierError::Empty));
    assert_eq!(parse_identifier("   "), Err(IdentifierError::Empty));
}

#[test]
fn malformed_identifier_is_rejected() {
    let err = parse_identifier("not-a-uuid").unwrap_err();
    assert!(matches!(err, IdentifierError::Malformed { .. }));
}

#[test]
fn nil_identifier_is_rejected() {
    let err = parse_identifier("00000000-0000-0000-0000-000000000000").unwrap_err();
    assert_eq!(err, IdentifierError::Nil);
    assert!(!is_valid_identifier(&uuid::Uuid::nil()));
}

#[test]
fn identifier_list_skips_empty_segments() {
    let a = new_identifier();
    let b = new_identifier();
    let list = parse_identifier_list(&format!("{a}, ,{b},")).unwrap();
    assert_eq!(list, vec![a, b]);
}

#[test]
fn identifier_list_fails_on_any_bad_entry() {
    let a = new_identifier();
    assert!(parse_identifier_list(&format!("{a},nope")).is_err());
}
