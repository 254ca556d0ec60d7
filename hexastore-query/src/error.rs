use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A merge or aggregate bound a variable to two different terms.
    #[error(transparent)]
    Binding(#[from] hexastore_model::Error),
}
