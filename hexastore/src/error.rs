use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] hexastore_store::Error),

    #[error(transparent)]
    Query(#[from] hexastore_query::Error),

    #[error(transparent)]
    Reason(#[from] hexastore_reason::Error),

    #[error(transparent)]
    Turtle(#[from] hexastore_turtle::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
