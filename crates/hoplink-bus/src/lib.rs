//! Click-event bus for the Hoplink platform.
//!
//! Click events travel from the resolver to the analytics ingester on
//! the `url.clicked` subject with at-least-once delivery.
//! [`NatsEventBus`] is the production backend; [`MemoryEventBus`]
//! provides the same contract in-process for tests. The payload codec
//! lives in [`codec`] because consumers must accept both raw JSON and
//! base64-wrapped JSON.

pub mod codec;
pub mod memory;
pub mod nats;

pub use codec::{decode_click_payload, encode_click_payload};
pub use memory::MemoryEventBus;
pub use nats::NatsEventBus;

/// Subject every click event is published on.
pub const CLICK_SUBJECT: &str = "url.clicked";
/// Queue group shared by ingester instances so each event is handed to
/// exactly one member (delivery may still repeat on redelivery).
pub const INGESTER_QUEUE_GROUP: &str = "hoplink-analytics";
