//! Forward-chaining inference over a hexastore.
//!
//! Facts inserted through a [`ForwardReasoner`] are saturated against the
//! registered rules until fixpoint, with every derivation's premises
//! recorded as provenance so retracting a fact cascades to everything that
//! no longer has independent support. Rules are written in a small textual
//! DSL (see [`parse`]) or supplied programmatically; a default RDFS/OWL
//! rule pack ships as data in the same DSL.

mod defaults;
mod error;
mod parser;
mod reasoner;
mod rule;

pub use defaults::default_reasoner;
pub use error::{Error, Result};
pub use parser::{parse, parse_and_register};
pub use reasoner::{Adaptor, ForwardReasoner};
pub use rule::{
    Constraint, NativeRule, ParsedRule, RegisterRule, RuleAction, RuleHead, SimpleRule,
};
