//! Query evaluation over a hexastore: streamed basic-graph-pattern
//! matching with index selection driven by ORDER BY, plus the algebraic
//! operators layered on top (left join, filter, projection, DISTINCT,
//! LIMIT, grouped aggregation).

mod aggregate;
mod algebra;
mod engine;
mod error;

pub use aggregate::Aggregate;
pub use algebra::{Operator, evaluate};
pub use engine::{Stats, execute};
pub use error::{Error, Result};
