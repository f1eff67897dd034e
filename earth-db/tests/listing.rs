use earth_catalog::*;
use earth_db::*;
use rusqlite::Connection;

fn creator() -> UserMinimal {
    UserMinimal {
        email: "a@b.com".to_string(),
        name: "A".to_string(),
    }
}

struct World {
    asia: Continent,
    europe: Continent,
    japan: Country,
    france: Country,
    tokyo: City,
    osaka: City,
    paris: City,
}

fn seed(conn: &Connection) -> World {
    let asia = create(
        conn,
        &Continent::new("Asia", ContinentType::Asia, 44_579_000.0, creator()),
    )
    .unwrap();
    let europe = create(
        conn,
        &Continent::new("Europe", ContinentType::Europe, 10_180_000.0, creator()),
    )
    .unwrap();
    let japan = create(
        conn,
        &Country::new(asia.uuid, "Japan", CountryDetails::new("81", "JP", "JPY"), creator()),
    )
    .unwrap();
    let france = create(
        conn,
        &Country::new(europe.uuid, "France", CountryDetails::new("33", "FR", "EUR"), creator()),
    )
    .unwrap();
    let tokyo = create(
        conn,
        &City::new(asia.uuid, japan.uuid, "Tokyo", true, creator()),
    )
    .unwrap();
    let osaka = create(
        conn,
        &City::new(asia.uuid, japan.uuid, "Osaka", false, creator()),
    )
    .unwrap();
    let paris = create(
        conn,
        &City::new(europe.uuid, france.uuid, "Paris", true, creator()),
    )
    .unwrap();
    World {
        asia,
        europe,
        japan,
        france,
        tokyo,
        osaka,
        paris,
    }
}

fn names<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut names: Vec<&str> = items.into_iter().collect();
    names.sort();
    names
}

// ── Continents ──────────────────────────────────────────────────────────────

#[test]
fn list_continents_without_children() {
    let conn = open_memory().unwrap();
    seed(&conn);
    let continents = list_continents(&conn, &ContinentQueryOptions::default()).unwrap();
    assert_eq!(continents.len(), 2);
    assert!(continents.iter().all(|c| c.details.is_none()));
}

#[test]
fn list_continents_with_children() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let options = ContinentQueryOptions {
        with_countries: true,
        with_cities: true,
        ..Default::default()
    };
    let continents = list_continents(&conn, &options).unwrap();
    let asia = continents.iter().find(|c| c.uuid == world.asia.uuid).unwrap();
    let details = asia.details.as_ref().unwrap();

    let countries = details.countries.as_ref().unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].uuid, world.japan.uuid);
    assert_eq!(countries[0].continent_uuid, world.asia.uuid);

    let cities = details.cities.as_ref().unwrap();
    assert_eq!(
        names(cities.iter().map(|c| c.name.as_str())),
        vec!["Osaka", "Tokyo"]
    );
    assert!(cities.iter().all(|c| c.country_uuid == world.japan.uuid));
}

#[test]
fn list_continents_only_countries_leaves_cities_unset() {
    let conn = open_memory().unwrap();
    seed(&conn);
    let options = ContinentQueryOptions {
        with_countries: true,
        ..Default::default()
    };
    for continent in list_continents(&conn, &options).unwrap() {
        let details = continent.details.unwrap();
        assert!(details.countries.is_some());
        assert!(details.cities.is_none());
    }
}

#[test]
fn list_continents_by_type_and_uuid() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);

    let by_type = ContinentQueryOptions {
        types: vec![ContinentType::Europe],
        ..Default::default()
    };
    let found = list_continents(&conn, &by_type).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uuid, world.europe.uuid);

    let by_uuid = ContinentQueryOptions {
        uuids: vec![world.asia.uuid],
        ..Default::default()
    };
    let found = list_continents(&conn, &by_uuid).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uuid, world.asia.uuid);
}

#[test]
fn deleted_continents_only_listed_on_request() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    soft_delete::<Continent>(&conn, &world.europe.uuid).unwrap();

    let live = list_continents(&conn, &ContinentQueryOptions::default()).unwrap();
    assert_eq!(live.len(), 1);

    let all = list_continents(
        &conn,
        &ContinentQueryOptions {
            include_deleted: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().any(|c| c.deleted_state.is_deleted()));
}

// ── Countries ───────────────────────────────────────────────────────────────

#[test]
fn list_countries_resolves_continent() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let countries = list_countries(&conn, &CountryQueryOptions::default()).unwrap();
    assert_eq!(countries.len(), 2);
    let france = countries.iter().find(|c| c.uuid == world.france.uuid).unwrap();
    assert_eq!(france.continent_uuid, world.europe.uuid);
    assert!(france.details.continent.is_none());
    assert!(france.details.cities.is_none());
}

#[test]
fn list_countries_by_continent_type() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let options = CountryQueryOptions {
        continent_types: vec![ContinentType::Asia],
        with_continent: true,
        with_cities: true,
        ..Default::default()
    };
    let countries = list_countries(&conn, &options).unwrap();
    assert_eq!(countries.len(), 1);

    let japan = &countries[0];
    assert_eq!(japan.uuid, world.japan.uuid);
    assert_eq!(
        japan.details.continent.as_ref().unwrap().continent_type,
        ContinentType::Asia
    );
    let cities = japan.details.cities.as_ref().unwrap();
    assert_eq!(cities.len(), 2);
    assert!(cities.iter().all(|c| c.country_uuid == world.japan.uuid));
    assert!(cities.iter().all(|c| c.continent_uuid == world.asia.uuid));
}

#[test]
fn list_countries_by_continent_and_own_uuid() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);

    let by_parent = CountryQueryOptions {
        continent_uuids: vec![world.europe.uuid],
        ..Default::default()
    };
    let found = list_countries(&conn, &by_parent).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].uuid, world.france.uuid);

    let by_uuid = CountryQueryOptions {
        uuids: vec![world.japan.uuid],
        continent_uuids: vec![world.europe.uuid],
        ..Default::default()
    };
    assert!(list_countries(&conn, &by_uuid).unwrap().is_empty());
}

#[test]
fn countries_of_deleted_continent_are_dropped() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    soft_delete::<Continent>(&conn, &world.asia.uuid).unwrap();

    let countries = list_countries(&conn, &CountryQueryOptions::default()).unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].uuid, world.france.uuid);
}

// ── Cities ──────────────────────────────────────────────────────────────────

#[test]
fn list_cities_by_continent_type() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let options = CityQueryOptions {
        continent_types: vec![ContinentType::Asia],
        ..Default::default()
    };
    let cities = list_cities(&conn, &options).unwrap();
    assert_eq!(
        names(cities.iter().map(|c| c.name.as_str())),
        vec!["Osaka", "Tokyo"]
    );
    assert!(cities.iter().all(|c| c.continent_uuid == world.asia.uuid));
}

#[test]
fn list_cities_with_snapshots() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let options = CityQueryOptions {
        with_country: true,
        with_continent: true,
        uuids: vec![world.paris.uuid],
        ..Default::default()
    };
    let cities = list_cities(&conn, &options).unwrap();
    assert_eq!(cities.len(), 1);

    let paris = &cities[0];
    let country = paris.details.country.as_ref().unwrap();
    assert_eq!(country.uuid, world.france.uuid);
    assert_eq!(country.continent_uuid, world.europe.uuid);
    assert_eq!(
        paris.details.continent.as_ref().unwrap().uuid,
        world.europe.uuid
    );
}

#[test]
fn list_cities_by_country() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    let options = CityQueryOptions {
        country_uuids: vec![world.japan.uuid],
        ..Default::default()
    };
    let cities = list_cities(&conn, &options).unwrap();
    assert_eq!(cities.len(), 2);
    assert!(cities.iter().all(|c| c.details.country.is_none()));
    assert!(cities.iter().any(|c| c.uuid == world.osaka.uuid));
}

#[test]
fn cities_of_deleted_country_are_dropped() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    soft_delete::<Country>(&conn, &world.japan.uuid).unwrap();

    let cities = list_cities(&conn, &CityQueryOptions::default()).unwrap();
    assert_eq!(cities.len(), 1);
    assert_eq!(cities[0].uuid, world.paris.uuid);

    let options = ContinentQueryOptions {
        with_cities: true,
        uuids: vec![world.asia.uuid],
        ..Default::default()
    };
    let asia = list_continents(&conn, &options).unwrap();
    assert!(asia[0].details.as_ref().unwrap().cities.as_ref().unwrap().is_empty());
}

#[test]
fn deleted_city_listed_only_on_request() {
    let conn = open_memory().unwrap();
    let world = seed(&conn);
    soft_delete::<City>(&conn, &world.tokyo.uuid).unwrap();

    let live = list_cities(&conn, &CityQueryOptions::default()).unwrap();
    assert!(live.iter().all(|c| c.uuid != world.tokyo.uuid));

    let all = list_cities(
        &conn,
        &CityQueryOptions {
            include_deleted: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(all.iter().any(|c| c.uuid == world.tokyo.uuid));
}

#[test]
fn empty_store_lists_nothing() {
    let conn = open_memory().unwrap();
    assert!(list_continents(&conn, &ContinentQueryOptions::default()).unwrap().is_empty());
    assert!(list_countries(&conn, &CountryQueryOptions::default()).unwrap().is_empty());
    assert!(list_cities(&conn, &CityQueryOptions::default()).unwrap().is_empty());
}
