use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A contract breach inside the store. Fatal; no recovery.
    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("invalid log magic")]
    InvalidMagic,

    #[error("log checksum mismatch at offset {offset}")]
    WalChecksumMismatch { offset: u64 },

    #[error("log protocol error: {0}")]
    WalProtocol(&'static str),

    #[error("log record too large: {0} bytes")]
    WalRecordTooLarge(u64),
}
