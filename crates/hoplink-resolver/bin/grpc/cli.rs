use clap::Parser;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:50052";

#[derive(Debug, Parser)]
#[command(name = "hoplink-resolver-grpc")]
pub struct Cli {
    #[arg(long, env = "HOPLINK_RESOLVER_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "CACHE_URL")]
    pub cache_url: String,

    #[arg(long, env = "BUS_URL")]
    pub bus_url: String,

    /// Width of the session bucket in seconds.
    #[arg(long, env = "SESSION_WINDOW_SECS", default_value_t = 300)]
    pub session_window_secs: u64,

    #[arg(long, env = "SERVICE_NAME", default_value = "hoplink-resolver")]
    pub service_name: String,

    #[arg(long, env = "SERVICE_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub service_version: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,
}
