use hoplink_core::{BusError, StorageError};
use thiserror::Error;

/// Failure while ingesting one click payload.
///
/// Decode failures are dead-lettered (logged and dropped); store
/// failures are surfaced so the caller can decide whether the delivery
/// should be retried.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] BusError),
    #[error(transparent)]
    Store(#[from] StorageError),
}
