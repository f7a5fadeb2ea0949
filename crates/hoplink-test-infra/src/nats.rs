use crate::Result;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};

/// Test fixture for a disposable NATS server.
pub struct NatsServer {
    container: ContainerAsync<GenericImage>,
}

impl NatsServer {
    pub async fn new() -> Result<Self> {
        let container = GenericImage::new("nats", "2")
            .with_exposed_port(4222_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("Server is ready"))
            .start()
            .await?;

        Ok(Self { container })
    }

    pub async fn host(&self) -> Result<String> {
        Ok(self.container.get_host().await?.to_string())
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(4222).await?)
    }

    pub async fn bus_url(&self) -> Result<String> {
        Ok(format!("nats://{}:{}", self.host().await?, self.port().await?))
    }

    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
