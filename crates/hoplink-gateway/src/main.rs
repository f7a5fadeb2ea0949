mod app;
mod cli;
mod error;
mod handlers;
mod model;
mod state;

use crate::app::App;
use crate::cli::Cli;
use crate::state::AppState;
use clap::Parser;
use hoplink_proto::analytics::v1::analytics_service_client::AnalyticsServiceClient;
use hoplink_proto::resolver::v1::resolver_service_client::ResolverServiceClient;
use hoplink_proto::shortener::v1::shortener_service_client::ShortenerServiceClient;
use std::net::SocketAddr;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Deadline for shortener/resolver RPCs.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);
/// Analytics queries scan the columnar store and get more headroom.
const ANALYTICS_TIMEOUT: Duration = Duration::from_secs(15);

async fn connect(url: &str, timeout: Duration) -> Result<Channel, tonic::transport::Error> {
    Endpoint::from_shared(url.to_string())?
        .timeout(timeout)
        .connect()
        .await
}

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
        base_url = %config.base_url,
        environment = %config.environment,
        "starting gateway"
    );

    let shortener =
        ShortenerServiceClient::new(connect(&config.shortener_url, RPC_TIMEOUT).await?);
    let resolver = ResolverServiceClient::new(connect(&config.resolver_url, RPC_TIMEOUT).await?);
    let analytics =
        AnalyticsServiceClient::new(connect(&config.analytics_url, ANALYTICS_TIMEOUT).await?);

    let state = AppState::builder()
        .shortener(shortener)
        .resolver(resolver)
        .analytics(analytics)
        .base_url(config.base_url.clone())
        .service_name(config.service_name.clone())
        .service_version(config.service_version.clone())
        .build();

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
