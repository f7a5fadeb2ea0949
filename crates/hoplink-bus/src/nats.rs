use crate::codec::encode_click_payload;
use crate::{CLICK_SUBJECT, INGESTER_QUEUE_GROUP};
use async_trait::async_trait;
use futures::StreamExt;
use hoplink_core::{BusError, ClickEvent, EventPublisher, EventStream};
use std::time::Duration;
use tracing::{debug, trace, warn};

type Result<T> = std::result::Result<T, BusError>;

/// NATS-backed click-event bus.
///
/// Publishing retries transient failures a bounded number of times;
/// callers on the resolve path treat a final failure as a dropped
/// event, never as a failed resolve.
#[derive(Debug, Clone)]
pub struct NatsEventBus {
    client: async_nats::Client,
    publish_attempts: u32,
    retry_delay: Duration,
}

impl NatsEventBus {
    /// Connects to the bus at the given URL.
    pub async fn connect(bus_url: &str) -> Result<Self> {
        let client = async_nats::connect(bus_url)
            .await
            .map_err(|e| BusError::Unavailable(format!("failed to connect to NATS: {e}")))?;
        Ok(Self::new(client))
    }

    /// Wraps an existing client.
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            publish_attempts: 3,
            retry_delay: Duration::from_millis(50),
        }
    }

    /// Opens the durable ingester subscription. Instances sharing the
    /// queue group split the stream between them.
    pub async fn subscribe_clicks(&self) -> Result<NatsClickStream> {
        let subscriber = self
            .client
            .queue_subscribe(CLICK_SUBJECT, INGESTER_QUEUE_GROUP.to_string())
            .await
            .map_err(|e| BusError::Subscribe(format!("failed to subscribe to clicks: {e}")))?;
        debug!(
            subject = CLICK_SUBJECT,
            queue_group = INGESTER_QUEUE_GROUP,
            "subscribed to click events"
        );
        Ok(NatsClickStream { subscriber })
    }
}

#[async_trait]
impl EventPublisher for NatsEventBus {
    async fn publish_click(&self, event: &ClickEvent) -> Result<()> {
        let payload = encode_click_payload(event)?;

        let mut last_error = None;
        for attempt in 0..self.publish_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }

            match self
                .client
                .publish(CLICK_SUBJECT, payload.clone().into())
                .await
            {
                Ok(()) => {
                    // Flush so the event leaves the client buffer before
                    // the detached publisher task finishes.
                    if let Err(e) = self.client.flush().await {
                        warn!(error = %e, "failed to flush click publish");
                    }
                    trace!(code = %event.short_code, "published click event");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        code = %event.short_code,
                        attempt,
                        error = %e,
                        "click publish failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(BusError::Publish(format!(
            "click publish failed after {} attempts: {}",
            self.publish_attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// Stream of raw click payloads from the NATS subscription.
pub struct NatsClickStream {
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl EventStream for NatsClickStream {
    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        self.subscriber
            .next()
            .await
            .map(|message| message.payload.to_vec())
    }
}
