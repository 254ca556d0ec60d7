//! Core RDF data model for the hexastore workspace.
//!
//! This crate defines the vocabulary shared by every other layer: terms and
//! their cross-type total order, triples and triple patterns, blank-node
//! factories, order descriptors and query solutions. It deliberately has no
//! storage or query logic of its own.
//!
//! The cross-type order follows the SPARQL ordering extension: a reified
//! triple sorts below a blank node, which sorts below an IRI, and so on
//! through plain strings, language-tagged strings, integers, decimals,
//! doubles and typed literals. "Unbound" (the lowest point of the order)
//! is represented as `Option::None` at comparison sites, and variables
//! (the highest) only exist in patterns, never in stored triples.

mod error;
mod namespace;
mod solution;
mod term;

pub mod vocab;

pub use error::{Error, Result};
pub use namespace::Namespace;
pub use solution::{Order, OrderCondition, Solution};
pub use term::{
    BlankNode, BlankNodeFactory, Iri, LangString, Term, TermPattern, Triple, TriplePattern,
    TypedLiteral, Variable,
};
