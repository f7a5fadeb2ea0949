//! Primary relation store for Hoplink URL mappings.
//!
//! [`PgMappingStore`] is the production backend over Postgres;
//! [`InMemoryMappingStore`] implements the same contract for unit
//! tests. Both are consumed through the ports in `hoplink-core`.

pub mod memory;
pub mod postgres;

pub use hoplink_core::{ReadRepository, Repository, StorageError};
pub use memory::InMemoryMappingStore;
pub use postgres::PgMappingStore;
