use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A solution merge saw the same variable bound to two different terms.
    /// This indicates a planner bug; there is no recovery.
    #[error("variable ${variable} bound to conflicting terms")]
    ConflictingBinding { variable: String },
}
