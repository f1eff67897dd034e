//! Server configuration.
//!
//! Priority: CLI flags > env vars > config file > defaults.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ServerError;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_DATABASE: &str = "earth.db";
pub const DEFAULT_POOL_SIZE: u32 = 8;

pub const ENV_LISTEN: &str = "EARTH_LISTEN";
pub const ENV_DATABASE: &str = "EARTH_DATABASE";
pub const ENV_MIGRATIONS_DIR: &str = "EARTH_MIGRATIONS_DIR";
pub const ENV_POOL_SIZE: &str = "EARTH_POOL_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub database: PathBuf,
    /// Directory to read migration files from. `None` uses the embedded set.
    pub migrations_dir: Option<PathBuf>,
    pub pool_size: u32,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub database: Option<PathBuf>,
    pub migrations_dir: Option<PathBuf>,
    pub pool_size: Option<u32>,
}

/// TOML config file format.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    pub server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ServerSection {
    pub listen: Option<String>,
    pub database: Option<PathBuf>,
    pub migrations_dir: Option<PathBuf>,
    pub pool_size: Option<u32>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self, ServerError> {
        let text = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Return the path to the default config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("earth-api").join("config.toml"))
}

impl ServerConfig {
    /// Load configuration from the process environment and config file.
    ///
    /// An explicit `config_file` must exist; the default one is optional.
    pub fn load(
        config_file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ServerError> {
        let file = match config_file {
            Some(path) => ConfigFile::read(path)?,
            None => match config_path().filter(|p| p.exists()) {
                Some(path) => {
                    log::debug!("Reading config from {}", path.display());
                    ConfigFile::read(&path)?
                }
                None => ConfigFile::default(),
            },
        };
        Self::resolve(overrides, |key| std::env::var(key).ok(), file)
    }

    /// Merge the layers. `env` looks up an environment variable by name.
    pub fn resolve(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        file: ConfigFile,
    ) -> Result<Self, ServerError> {
        let section = file.server.unwrap_or_default();

        let listen = overrides
            .listen
            .or_else(|| env(ENV_LISTEN))
            .or(section.listen)
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen
            .parse()
            .map_err(|e| ServerError::config(format!("invalid listen address '{listen}': {e}")))?;

        let database = overrides
            .database
            .or_else(|| env(ENV_DATABASE).map(PathBuf::from))
            .or(section.database)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let migrations_dir = overrides
            .migrations_dir
            .or_else(|| env(ENV_MIGRATIONS_DIR).map(PathBuf::from))
            .or(section.migrations_dir);

        let pool_size = match overrides.pool_size {
            Some(size) => size,
            None => match env(ENV_POOL_SIZE) {
                Some(value) => value.trim().parse().map_err(|_| {
                    ServerError::config(format!("{ENV_POOL_SIZE} must be a positive integer, got '{value}'"))
                })?,
                None => section.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
            },
        };
        if pool_size == 0 {
            return Err(ServerError::config("pool size must be at least 1"));
        }

        Ok(Self {
            listen,
            database,
            migrations_dir,
            pool_size,
        })
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listen={} database={} migrations={} pool_size={}",
            self.listen,
            self.database.display(),
            self.migrations_dir
                .as_deref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "embedded".to_string()),
            self.pool_size
        )
    }
}
