use thiserror::Error;

/// Type alias for results carrying the service-level error taxonomy.
pub type Result<T> = std::result::Result<T, Error>;

/// Service-level error taxonomy shared by all Hoplink services.
///
/// Validation errors are never retried internally. `Unavailable` is
/// reserved for failures of an authoritative backend; degraded
/// collaborators (cache, bus) are logged and swallowed by the services
/// instead of surfacing here. Expiry is not an error: the resolver
/// reports it as an ordinary resolution outcome.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("short code not found")]
    NotFound,
    #[error("owner does not match")]
    Unauthorized,
    #[error("alias already exists: {0}")]
    AliasTaken(String),
    #[error("short code space exhausted after {0} attempts")]
    ExhaustedCodeSpace(u32),
    #[error("stored target violates the current safety policy: {0}")]
    InvalidTarget(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(code) => Error::AliasTaken(code),
            other => Error::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("alias already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("bus unavailable: {0}")]
    Unavailable(String),
    #[error("bus publish failed: {0}")]
    Publish(String),
    #[error("bus subscribe failed: {0}")]
    Subscribe(String),
    #[error("bus payload is malformed: {0}")]
    Decode(String),
}
