mod cli;
mod error;
mod server;

use crate::cli::{Cli, StorageBackendArg};
use crate::server::ShortenerGrpcServer;
use clap::Parser;
use hoplink_cache::RedisCache;
use hoplink_core::repository::Repository;
use hoplink_proto::shortener::v1::shortener_service_server::ShortenerServiceServer;
use hoplink_shortener::{RandomCodeMinter, ShortenerService};
use hoplink_storage::{InMemoryMappingStore, PgMappingStore};
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
        storage_backend = %config.storage,
        environment = %config.environment,
        "starting shortener gRPC server"
    );

    let cache = RedisCache::connect(&config.cache_url).await?;

    match config.storage {
        StorageBackendArg::InMemory => {
            run_server(&config, InMemoryMappingStore::new(), cache).await?;
        }
        StorageBackendArg::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL is required when the storage backend is postgres")?;
            let repository = PgMappingStore::connect(database_url).await?;
            run_server(&config, repository, cache).await?;
        }
    }

    Ok(())
}

async fn run_server<R: Repository>(
    config: &Cli,
    repository: R,
    cache: RedisCache,
) -> Result<(), tonic::transport::Error> {
    let service = ShortenerService::new(repository, cache, RandomCodeMinter::new());
    let server = ShortenerGrpcServer::new(
        service,
        config.service_name.clone(),
        config.service_version.clone(),
    );

    tonic::transport::Server::builder()
        .add_service(ShortenerServiceServer::new(server))
        .serve(config.listen_addr)
        .await
}
