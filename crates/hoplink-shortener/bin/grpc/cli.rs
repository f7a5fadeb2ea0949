use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:50051";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "postgres")]
    Postgres,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Postgres => write!(f, "postgres"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hoplink-shortener-grpc")]
pub struct Cli {
    #[arg(long, env = "HOPLINK_SHORTENER_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = "STORAGE_BACKEND",
        value_enum,
        default_value_t = StorageBackendArg::Postgres
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = "DATABASE_URL", required_if_eq("storage", "postgres"))]
    pub database_url: Option<String>,

    #[arg(long, env = "CACHE_URL")]
    pub cache_url: String,

    #[arg(long, env = "SERVICE_NAME", default_value = "hoplink-shortener")]
    pub service_name: String,

    #[arg(long, env = "SERVICE_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub service_version: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,
}
