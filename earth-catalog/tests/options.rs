use std::collections::HashMap;

use earth_catalog::options::{query_bool, query_int_list, query_list};
use earth_catalog::*;

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn bool_flags_accept_true_and_one() {
    let q = query(&[("a", "TRUE"), ("b", "1"), ("c", "yes"), ("d", "0")]);
    assert!(query_bool(&q, "a", false));
    assert!(query_bool(&q, "b", false));
    assert!(!query_bool(&q, "c", true));
    assert!(!query_bool(&q, "d", true));
    assert!(query_bool(&q, "missing", true));
}

#[test]
fn lists_are_trimmed() {
    let q = query(&[("l", " a, b ,,c")]);
    assert_eq!(query_list(&q, "l"), vec!["a", "b", "c"]);
    assert!(query_list(&q, "missing").is_empty());
}

#[test]
fn single_element_list() {
    let q = query(&[("l", "3")]);
    assert_eq!(query_int_list(&q, "l").unwrap(), vec![3]);
}

#[test]
fn int_list_rejects_non_numbers() {
    let q = query(&[("l", "1,x")]);
    assert!(matches!(
        query_int_list(&q, "l"),
        Err(OptionsError::Integer { .. })
    ));
}

#[test]
fn continent_options_from_query() {
    let id = new_identifier();
    let q = query(&[
        ("with_countries", "true"),
        ("types", "1,3,1"),
        ("uuids", &id.to_string()),
        ("deleted", "1"),
    ]);
    let options = ContinentQueryOptions::from_query(&q).unwrap();
    assert!(options.with_countries);
    assert!(!options.with_cities);
    assert_eq!(
        options.types,
        vec![ContinentType::Asia, ContinentType::Europe]
    );
    assert_eq!(options.uuids, vec![id]);
    assert!(options.include_deleted);
}

#[test]
fn unknown_continent_type_is_rejected() {
    let q = query(&[("continent_types", "8")]);
    assert!(matches!(
        CountryQueryOptions::from_query(&q),
        Err(OptionsError::ContinentType { value: 8, .. })
    ));
}

#[test]
fn city_options_default_when_empty() {
    let options = CityQueryOptions::from_query(&HashMap::new()).unwrap();
    assert_eq!(options, CityQueryOptions::default());
}

#[test]
fn city_options_parent_list() {
    let a = new_identifier();
    let b = new_identifier();
    let q = query(&[
        ("country_uuids", &format!("{a},{b}")),
        ("with_country", "true"),
        ("with_continent", "True"),
    ]);
    let options = CityQueryOptions::from_query(&q).unwrap();
    assert_eq!(options.country_uuids, vec![a, b]);
    assert!(options.with_country);
    assert!(options.with_continent);
}
