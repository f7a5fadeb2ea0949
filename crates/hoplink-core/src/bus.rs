use crate::error::BusError;
use crate::event::ClickEvent;
use async_trait::async_trait;

/// Publisher side of the `url.clicked` subject.
///
/// Publishing is at-least-once intent: implementations may retry, and
/// consumers must tolerate duplicate deliveries.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish_click(&self, event: &ClickEvent) -> Result<(), BusError>;
}

/// A stream of raw click payloads from a bus subscription.
///
/// Payloads are handed over undecoded; the ingester owns decoding
/// because the wire may carry either raw JSON or base64-wrapped JSON.
#[async_trait]
pub trait EventStream: Send + 'static {
    /// Next payload, or `None` once the subscription closes.
    async fn next_payload(&mut self) -> Option<Vec<u8>>;
}
