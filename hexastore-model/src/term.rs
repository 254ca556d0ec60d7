use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use ordered_float::OrderedFloat;
use rust_decimal::Decimal;

use crate::solution::Solution;

/// A blank node, identified by the factory that minted it and a counter
/// within that factory. Two nodes from different factories are never equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlankNode {
    pub factory: u64,
    pub id: u64,
}

/// Mints blank nodes with a process-unique factory identity and a
/// monotonically increasing counter.
#[derive(Debug)]
pub struct BlankNodeFactory {
    factory: u64,
    counter: Cell<u64>,
}

static NEXT_FACTORY: AtomicU64 = AtomicU64::new(0);

impl BlankNodeFactory {
    pub fn new() -> Self {
        Self {
            factory: NEXT_FACTORY.fetch_add(1, AtomicOrdering::Relaxed),
            counter: Cell::new(0),
        }
    }

    pub fn fresh(&self) -> BlankNode {
        let id = self.counter.get();
        self.counter.set(id + 1);
        BlankNode {
            factory: self.factory,
            id,
        }
    }

    pub fn minted(&self) -> u64 {
        self.counter.get()
    }
}

impl Default for BlankNodeFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iri(pub String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Iri(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

/// A language-tagged string. Ordered by value, then language tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LangString {
    pub value: String,
    pub language: String,
}

/// A literal carrying an explicit datatype IRI. Ordered by lexical form,
/// then datatype.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypedLiteral {
    pub lexical: String,
    pub datatype: Iri,
}

/// An RDF term.
///
/// The variant declaration order IS the cross-type order; `derive(Ord)` is
/// load-bearing here. Extending the model with a new term kind means
/// choosing its rank by where the variant is inserted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Term {
    Triple(Box<Triple>),
    BlankNode(BlankNode),
    Iri(Iri),
    String(String),
    LangString(LangString),
    Integer(i64),
    Decimal(Decimal),
    Double(OrderedFloat<f64>),
    TypedLiteral(TypedLiteral),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(Iri::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Term::String(value.into())
    }

    pub fn double(value: f64) -> Self {
        Term::Double(OrderedFloat(value))
    }

    pub fn reified(triple: Triple) -> Self {
        Term::Triple(Box::new(triple))
    }

    pub fn as_triple(&self) -> Option<&Triple> {
        match self {
            Term::Triple(t) => Some(t),
            _ => None,
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Term::Iri(iri)
    }
}

impl From<BlankNode> for Term {
    fn from(node: BlankNode) -> Self {
        Term::BlankNode(node)
    }
}

impl From<Triple> for Term {
    fn from(triple: Triple) -> Self {
        Term::reified(triple)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Triple(t) => write!(f, "<< {} {} {} >>", t.s, t.p, t.o),
            Term::BlankNode(b) => write!(f, "_:b{}n{}", b.factory, b.id),
            Term::Iri(iri) => write!(f, "{iri}"),
            Term::String(s) => write!(f, "{s:?}"),
            Term::LangString(l) => write!(f, "{:?}@{}", l.value, l.language),
            Term::Integer(i) => write!(f, "{i}"),
            Term::Decimal(d) => write!(f, "{d}"),
            Term::Double(d) => write!(f, "{}", d.0),
            Term::TypedLiteral(t) => write!(f, "{:?}^^{}", t.lexical, t.datatype),
        }
    }
}

/// An asserted triple. Subjects and predicates are unconstrained at this
/// level; the reasoner and parsers enforce their own invariants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    pub s: Term,
    pub p: Term,
    pub o: Term,
}

impl Triple {
    pub fn new(s: impl Into<Term>, p: impl Into<Term>, o: impl Into<Term>) -> Self {
        Triple {
            s: s.into(),
            p: p.into(),
            o: o.into(),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.s, self.p, self.o)
    }
}

/// A query variable. Sorts above every concrete term, which the pattern
/// types below rely on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Variable(pub String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Variable(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// One slot of a triple pattern: either a concrete term or a variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TermPattern {
    Term(Term),
    Variable(Variable),
}

impl TermPattern {
    pub fn is_variable(&self) -> bool {
        matches!(self, TermPattern::Variable(_))
    }

    /// Resolves this slot under a solution: bound variables become their
    /// term, unbound variables stay as they are.
    pub fn resolve(&self, solution: &Solution) -> TermPattern {
        match self {
            TermPattern::Variable(v) => match solution.get(v) {
                Some(term) => TermPattern::Term(term.clone()),
                None => self.clone(),
            },
            TermPattern::Term(_) => self.clone(),
        }
    }
}

impl From<Term> for TermPattern {
    fn from(term: Term) -> Self {
        TermPattern::Term(term)
    }
}

impl From<Variable> for TermPattern {
    fn from(v: Variable) -> Self {
        TermPattern::Variable(v)
    }
}

impl From<Iri> for TermPattern {
    fn from(iri: Iri) -> Self {
        TermPattern::Term(Term::Iri(iri))
    }
}

/// A triple pattern: three slots, any of which may be a variable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriplePattern {
    pub s: TermPattern,
    pub p: TermPattern,
    pub o: TermPattern,
}

impl TriplePattern {
    pub fn new(
        s: impl Into<TermPattern>,
        p: impl Into<TermPattern>,
        o: impl Into<TermPattern>,
    ) -> Self {
        TriplePattern {
            s: s.into(),
            p: p.into(),
            o: o.into(),
        }
    }

    pub fn slots(&self) -> [&TermPattern; 3] {
        [&self.s, &self.p, &self.o]
    }

    /// Number of variable slots, counting repeats.
    pub fn variable_count(&self) -> usize {
        self.slots().iter().filter(|t| t.is_variable()).count()
    }

    /// Substitutes every bound variable with its term from `solution`.
    pub fn resolve(&self, solution: &Solution) -> TriplePattern {
        TriplePattern {
            s: self.s.resolve(solution),
            p: self.p.resolve(solution),
            o: self.o.resolve(solution),
        }
    }

    /// The pattern as a concrete triple, if no slot is a variable.
    pub fn ground(&self) -> Option<Triple> {
        match (&self.s, &self.p, &self.o) {
            (TermPattern::Term(s), TermPattern::Term(p), TermPattern::Term(o)) => Some(Triple {
                s: s.clone(),
                p: p.clone(),
                o: o.clone(),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Term(t) => write!(f, "{t}"),
            TermPattern::Variable(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} {})", self.s, self.p, self.o)
    }
}
