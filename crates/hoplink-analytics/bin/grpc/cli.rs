use clap::Parser;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:50053";

#[derive(Debug, Parser)]
#[command(name = "hoplink-analytics-grpc")]
pub struct Cli {
    #[arg(long, env = "HOPLINK_ANALYTICS_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "COLUMNAR_URL")]
    pub columnar_url: String,

    #[arg(long, env = "COLUMNAR_DATABASE", default_value = "hoplink")]
    pub columnar_database: String,

    #[arg(long, env = "CACHE_URL")]
    pub cache_url: String,

    #[arg(long, env = "BUS_URL")]
    pub bus_url: String,

    /// Events processed concurrently by the ingestion pool.
    #[arg(long, env = "INGEST_CONCURRENCY", default_value_t = 8)]
    pub ingest_concurrency: usize,

    #[arg(long, env = "SERVICE_NAME", default_value = "hoplink-analytics")]
    pub service_name: String,

    #[arg(long, env = "SERVICE_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub service_version: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,
}
