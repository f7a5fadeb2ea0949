use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("container error: {0}")]
    Container(#[from] testcontainers::TestcontainersError),
}
