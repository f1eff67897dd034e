use earth_catalog::*;
use earth_db::*;

#[test]
fn pooled_connections_share_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("earth.db");
    let pool = create_pool(&path, 2).unwrap();

    run_migrations(&pool.get().unwrap(), &Migrations::embedded()).unwrap();

    let creator = UserMinimal {
        email: "a@b.com".to_string(),
        name: "A".to_string(),
    };
    let created = {
        let conn = pool.get().unwrap();
        create(
            &conn,
            &Continent::new("Africa", ContinentType::Africa, 30_370_000.0, creator),
        )
        .unwrap()
    };

    let other = pool.get().unwrap();
    let fetched: Continent = get_by_uuid(&other, &created.uuid).unwrap();
    assert_eq!(fetched.name, "Africa");

    let foreign_keys: i64 = other
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}
