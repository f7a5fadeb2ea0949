mod cli;
mod error;
mod server;

use crate::cli::Cli;
use crate::server::ResolverGrpcServer;
use clap::Parser;
use hoplink_bus::NatsEventBus;
use hoplink_cache::RedisCache;
use hoplink_core::SharedCache;
use hoplink_proto::resolver::v1::resolver_service_server::ResolverServiceServer;
use hoplink_resolver::{CachedResolverStore, ResolverConfig, ResolverService};
use hoplink_storage::PgMappingStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::try_parse()?;

    info!(
        listen_addr = %config.listen_addr,
        environment = %config.environment,
        session_window_secs = config.session_window_secs,
        "starting resolver gRPC server"
    );

    let repository = PgMappingStore::connect(&config.database_url).await?;
    let cache = RedisCache::connect(&config.cache_url).await?;
    let bus = NatsEventBus::connect(&config.bus_url).await?;

    let shared: Arc<dyn SharedCache> = Arc::new(cache.clone());
    let store = CachedResolverStore::new(repository, cache).with_counters(shared);

    let resolver_config = ResolverConfig {
        session_window: Duration::from_secs(config.session_window_secs),
    };
    let service = ResolverService::new(store, bus, resolver_config);
    let server = ResolverGrpcServer::new(
        service,
        config.service_name.clone(),
        config.service_version.clone(),
    );

    tonic::transport::Server::builder()
        .add_service(ResolverServiceServer::new(server))
        .serve(config.listen_addr)
        .await?;

    Ok(())
}
