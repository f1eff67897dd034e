//! earth-api server
//!
//! REST API over a catalog of continents, countries and cities.

use std::path::PathBuf;

use clap::Parser;
use earth_server::{ConfigOverrides, ServerConfig, serve};

#[derive(Parser)]
#[command(name = "earth-api")]
#[command(about = "Serve the earth catalog REST API", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/earth-api/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (e.g., 127.0.0.1:8080)
    #[arg(short, long)]
    listen: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Read migration files from this directory instead of the built-in set
    #[arg(long)]
    migrations_dir: Option<PathBuf>,

    /// Maximum pooled database connections
    #[arg(long)]
    pool_size: Option<u32>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        listen: cli.listen,
        database: cli.database,
        migrations_dir: cli.migrations_dir,
        pool_size: cli.pool_size,
    };

    let config = match ServerConfig::load(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = serve(config).await {
        log::error!("{e}");
        std::process::exit(1);
    }
}
