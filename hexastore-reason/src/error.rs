use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] hexastore_query::Error),

    #[error(transparent)]
    Store(#[from] hexastore_store::Error),

    /// A rule head still contained a variable after substitution.
    #[error("rule head pattern {0} is not fully bound")]
    UnboundHead(String),

    #[error("rule parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
