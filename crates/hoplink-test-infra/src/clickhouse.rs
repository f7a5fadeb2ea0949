use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct ClickHouseConfig {
    #[builder(default = "hoplink".to_string())]
    database: String,
}

/// Test fixture for a disposable ClickHouse server (HTTP interface).
pub struct ClickHouseServer {
    container: ContainerAsync<GenericImage>,
    config: ClickHouseConfig,
}

impl ClickHouseServer {
    pub async fn new(config: ClickHouseConfig) -> Result<Self> {
        let container = GenericImage::new("clickhouse/clickhouse-server", "24")
            .with_exposed_port(8123_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("Ready for connections"))
            .with_env_var("CLICKHOUSE_DB", config.database.as_str())
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn host(&self) -> Result<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(8123).await?)
    }

    /// HTTP endpoint the `clickhouse` client connects to.
    pub async fn columnar_url(&self) -> Result<String> {
        Ok(format!("http://{}:{}", self.host().await?, self.port().await?))
    }

    pub fn database(&self) -> &str {
        &self.config.database
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
