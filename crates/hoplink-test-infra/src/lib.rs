//! Disposable backing-store containers for Hoplink integration tests.
//!
//! Each fixture starts one container, waits for readiness, and hands
//! out connection URLs. Tests own the fixture for the container's
//! lifetime; dropping it tears the container down.

pub mod clickhouse;
pub mod error;
pub mod nats;
pub mod postgres;
pub mod redis;

pub use clickhouse::{ClickHouseConfig, ClickHouseServer};
pub use error::{Error, Result};
pub use nats::NatsServer;
pub use postgres::{PostgresConfig, PostgresServer};
pub use redis::RedisServer;
