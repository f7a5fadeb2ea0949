use clap::Parser;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Parser)]
#[command(name = "hoplink-gateway")]
pub struct Cli {
    #[arg(long, env = "HOPLINK_GATEWAY_LISTEN_ADDR", default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(long, env = "SHORTENER_GRPC_URL", default_value = "http://127.0.0.1:50051")]
    pub shortener_url: String,

    #[arg(long, env = "RESOLVER_GRPC_URL", default_value = "http://127.0.0.1:50052")]
    pub resolver_url: String,

    #[arg(long, env = "ANALYTICS_GRPC_URL", default_value = "http://127.0.0.1:50053")]
    pub analytics_url: String,

    /// Public base URL rendered into short links.
    #[arg(long, env = "BASE_URL", default_value = "http://127.0.0.1:8080")]
    pub base_url: String,

    #[arg(long, env = "SERVICE_NAME", default_value = "hoplink-gateway")]
    pub service_name: String,

    #[arg(long, env = "SERVICE_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub service_version: String,

    #[arg(long, env = "ENVIRONMENT", default_value = "development")]
    pub environment: String,
}
