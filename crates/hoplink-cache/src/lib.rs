//! Shared cache implementations for the Hoplink platform.
//!
//! [`RedisCache`] backs the cross-service cache (URL projections,
//! session markers, rolling counters) with the key schema and TTL
//! discipline the services agree on. [`MokaUrlCache`] and
//! [`MemorySharedCache`] provide in-process implementations for tests
//! and single-node setups.

pub mod counters;
pub mod memory;
pub mod moka;
pub mod redis;
pub mod retry;

pub use counters::{RollingCounters, SessionMarkers};
pub use memory::MemorySharedCache;
pub use moka::MokaUrlCache;
pub use redis::RedisCache;
pub use retry::RetryPolicy;
