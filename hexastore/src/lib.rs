//! # Hexastore
//!
//! An embedded, in-memory RDF triple store with forward-chaining
//! inference.
//!
//! Triples live in a *hexastore*: six sorted orderings of the same triple
//! set, so a query pattern with any combination of fixed positions can
//! index straight to a sorted fan-out. A basic-graph-pattern engine plans
//! and executes conjunctive queries over those orderings, and a forward
//! reasoner materialises rule derivations as facts arrive, with per-
//! derivation provenance so retracting a fact retracts everything that
//! loses its last justification.
//!
//! ```no_run
//! use hexastore::{Store, Term, Triple, default_reasoner};
//!
//! fn main() -> hexastore::Result<()> {
//!     // Durable: every mutation is logged and replayed on open.
//!     let store = Store::open("family.wal")?;
//!     let mut reasoner = default_reasoner(store)?;
//!
//!     let spouse = Term::iri("https://schema.org/spouse");
//!     reasoner.insert(Triple::new(
//!         spouse.clone(),
//!         Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
//!         Term::iri("http://www.w3.org/2002/07/owl#SymmetricProperty"),
//!     ))?;
//!     reasoner.insert(Triple::new(
//!         Term::iri("http://example.com/alice"),
//!         spouse,
//!         Term::iri("http://example.com/bob"),
//!     ))?;
//!     // (bob spouse alice) is now derivable from the store.
//!     Ok(())
//! }
//! ```
//!
//! For purely in-memory work, wrap a [`MemoryHexastore`] instead of a
//! [`Store`]; both implement [`TripleWriter`].

mod error;
mod store;

pub use error::{Error, Result};
pub use store::Store;

pub use hexastore_model::{
    BlankNode, BlankNodeFactory, Iri, LangString, Namespace, Order, OrderCondition, Solution,
    Term, TermPattern, Triple, TriplePattern, TypedLiteral, Variable, vocab,
};
pub use hexastore_store::{
    BulkInserter, IndexOrder, MemoryHexastore, TripleReader, TripleStatus, TripleStatusItem,
    TripleWriter, VersionedHexastore, Wal, WalEntry,
};

pub use hexastore_query as query;
pub use hexastore_reason as reason;
pub use hexastore_turtle as turtle;

pub use hexastore_reason::{ForwardReasoner, default_reasoner};
