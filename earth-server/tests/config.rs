use std::collections::HashMap;
use std::path::PathBuf;

use earth_server::config::*;
use earth_server::{ConfigOverrides, ServerConfig, ServerError};

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

fn file(toml_text: &str) -> ConfigFile {
    toml::from_str(toml_text).unwrap()
}

#[test]
fn defaults_apply_when_nothing_is_set() {
    let config =
        ServerConfig::resolve(ConfigOverrides::default(), env(&[]), ConfigFile::default()).unwrap();
    assert_eq!(config.listen.to_string(), DEFAULT_LISTEN);
    assert_eq!(config.database, PathBuf::from(DEFAULT_DATABASE));
    assert_eq!(config.migrations_dir, None);
    assert_eq!(config.pool_size, DEFAULT_POOL_SIZE);
}

#[test]
fn layers_apply_in_priority_order() {
    let config_file = file(
        r#"
        [server]
        listen = "127.0.0.1:7000"
        database = "from-file.db"
        migrations_dir = "file-sql"
        pool_size = 2
        "#,
    );
    let vars = env(&[(ENV_DATABASE, "from-env.db"), (ENV_POOL_SIZE, "4")]);
    let overrides = ConfigOverrides {
        pool_size: Some(16),
        ..Default::default()
    };

    let config = ServerConfig::resolve(overrides, vars, config_file).unwrap();
    assert_eq!(config.listen.to_string(), "127.0.0.1:7000");
    assert_eq!(config.database, PathBuf::from("from-env.db"));
    assert_eq!(config.migrations_dir, Some(PathBuf::from("file-sql")));
    assert_eq!(config.pool_size, 16);
}

#[test]
fn invalid_values_are_config_errors() {
    let bad_listen = ConfigOverrides {
        listen: Some("not an address".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        ServerConfig::resolve(bad_listen, env(&[]), ConfigFile::default()),
        Err(ServerError::Config(_))
    ));

    assert!(matches!(
        ServerConfig::resolve(
            ConfigOverrides::default(),
            env(&[(ENV_POOL_SIZE, "many")]),
            ConfigFile::default()
        ),
        Err(ServerError::Config(_))
    ));

    assert!(matches!(
        ServerConfig::resolve(
            ConfigOverrides::default(),
            env(&[(ENV_POOL_SIZE, "0")]),
            ConfigFile::default()
        ),
        Err(ServerError::Config(_))
    ));
}

#[test]
fn explicit_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server]\ndatabase = \"explicit.db\"\n").unwrap();

    let parsed = ConfigFile::read(&path).unwrap();
    assert_eq!(
        parsed.server.unwrap().database,
        Some(PathBuf::from("explicit.db"))
    );

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        ConfigFile::read(&missing),
        Err(ServerError::ConfigRead { .. })
    ));

    std::fs::write(&path, "[server\n").unwrap();
    assert!(matches!(
        ConfigFile::read(&path),
        Err(ServerError::ConfigParse { .. })
    ));
}

#[test]
fn display_names_embedded_migrations() {
    let config =
        ServerConfig::resolve(ConfigOverrides::default(), env(&[]), ConfigFile::default()).unwrap();
    assert_eq!(
        config.to_string(),
        "listen=0.0.0.0:8080 database=earth.db migrations=embedded pool_size=8"
    );
}
