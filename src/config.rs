//! Command line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "meuat-api", version)]
#[command(about = "MeuAT geospatial API - farm parcel queries over PostGIS")]
pub struct Config {
    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub server: ServerConfig,

    /// Log filter directive (overrides RUST_LOG)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[arg(long = "database-url", env = "DATABASE_URL")]
    pub url: String,

    /// Upper bound of pooled connections (base pool plus overflow)
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 30)]
    pub max_connections: u32,

    /// Connections kept open while idle
    #[arg(long, env = "DB_MIN_CONNECTIONS", default_value_t = 10)]
    pub min_connections: u32,
}

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// HTTP port
    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Answer CORS preflights for any origin
    #[arg(long, env = "CORS_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub cors_enabled: bool,

    /// Create the PostGIS extension and tables on startup
    #[arg(long, env = "INIT_SCHEMA")]
    pub init_schema: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Load parcels from a GeoJSON FeatureCollection, once per seed name
    Seed(SeedArgs),
}

#[derive(Args, Debug, Clone)]
pub struct SeedArgs {
    /// GeoJSON file holding the parcel features
    #[arg(long, env = "SEED_FILE", default_value = "seed/data/fazendas.geojson")]
    pub file: PathBuf,

    /// Ledger name guarding the load
    #[arg(long, env = "SEED_NAME", default_value = crate::seed::DEFAULT_SEED_NAME)]
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}
