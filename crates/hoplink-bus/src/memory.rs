use crate::codec::encode_click_payload;
use async_trait::async_trait;
use hoplink_core::{BusError, ClickEvent, EventPublisher, EventStream};
use tokio::sync::broadcast;

type Result<T> = std::result::Result<T, BusError>;

/// In-process click bus for unit tests.
///
/// Fan-out uses a broadcast channel, so every subscription opened
/// before a publish sees the event. A bounded buffer drops the oldest
/// events on overflow, which mirrors the lossy nature of the real bus
/// under backpressure.
#[derive(Debug, Clone)]
pub struct MemoryEventBus {
    sender: broadcast::Sender<Vec<u8>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// Opens a subscription receiving events published from now on.
    pub fn subscribe_clicks(&self) -> MemoryClickStream {
        MemoryClickStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publishes a pre-encoded payload, letting tests exercise the
    /// wrapped-encoding path of consumers.
    pub fn publish_raw(&self, payload: Vec<u8>) {
        let _ = self.sender.send(payload);
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for MemoryEventBus {
    async fn publish_click(&self, event: &ClickEvent) -> Result<()> {
        let payload = encode_click_payload(event)?;
        self.sender
            .send(payload)
            .map_err(|_| BusError::Publish("no subscribers".to_string()))?;
        Ok(())
    }
}

/// Stream end of a [`MemoryEventBus`] subscription.
pub struct MemoryClickStream {
    receiver: broadcast::Receiver<Vec<u8>>,
}

#[async_trait]
impl EventStream for MemoryClickStream {
    async fn next_payload(&mut self) -> Option<Vec<u8>> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                // Skip over dropped events; consumers tolerate loss.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
