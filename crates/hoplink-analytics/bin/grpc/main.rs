mod cli;
mod error;
mod server;

use crate::cli::Cli;
use crate::server::AnalyticsGrpcServer;
use clap::Parser;
use hoplink_analytics::{
    AnalyticsService, ClickHouseClickStore, ClickIngester, HeuristicGeoProvider, IngesterConfig,
};
use hoplink_bus::NatsEventBus;
use hoplink_cache::RedisCache;
use hoplink_proto::analytics::v1::analytics_service_server::AnalyticsServiceServer;
use std::sync::Arc;
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
        columnar_database = %config.columnar_database,
        environment = %config.environment,
        "starting analytics gRPC server"
    );

    let store = ClickHouseClickStore::connect(&config.columnar_url, &config.columnar_database);
    store.ensure_schema().await?;
    let store = Arc::new(store);

    let cache = Arc::new(RedisCache::connect(&config.cache_url).await?);
    let bus = NatsEventBus::connect(&config.bus_url).await?;

    let ingester = Arc::new(ClickIngester::new(
        store.as_ref().clone(),
        cache,
        Arc::new(HeuristicGeoProvider),
        IngesterConfig {
            concurrency: config.ingest_concurrency,
        },
    ));

    // The durable subscription drains into the worker pool for as long
    // as the process lives.
    let stream = bus.subscribe_clicks().await?;
    tokio::spawn(Arc::clone(&ingester).run(stream));

    let query = AnalyticsService::new(store);
    let server = AnalyticsGrpcServer::new(
        query,
        ingester,
        config.service_name.clone(),
        config.service_version.clone(),
    );

    tonic::transport::Server::builder()
        .add_service(AnalyticsServiceServer::new(server))
        .serve(config.listen_addr)
        .await?;

    Ok(())
}
