use hexastore_model::{Order, Term, Triple};

use crate::error::Result;

/// One of the six orderings of a triple set. `Spo`, `Pos` and `Osp` are the
/// natural orderings that own leaf storage; `Sop`, `Ops` and `Pso` are their
/// paired reverses, sharing the same leaves with outer keys swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOrder {
    Spo,
    Pos,
    Osp,
    Sop,
    Ops,
    Pso,
}

impl IndexOrder {
    pub const ALL: [IndexOrder; 6] = [
        IndexOrder::Spo,
        IndexOrder::Pos,
        IndexOrder::Osp,
        IndexOrder::Sop,
        IndexOrder::Ops,
        IndexOrder::Pso,
    ];

    /// Rebuilds a natural (s, p, o) triple from a tuple read off this
    /// ordering in traversal order.
    pub fn to_natural(self, t1: Term, t2: Term, t3: Term) -> Triple {
        let (s, p, o) = match self {
            IndexOrder::Spo => (t1, t2, t3),
            IndexOrder::Pos => (t3, t1, t2),
            IndexOrder::Osp => (t2, t3, t1),
            IndexOrder::Sop => (t1, t3, t2),
            IndexOrder::Ops => (t3, t2, t1),
            IndexOrder::Pso => (t2, t1, t3),
        };
        Triple { s, p, o }
    }

    /// Splits a natural triple into (trunk, branch, leaf) keys for this
    /// ordering.
    pub fn from_natural(self, triple: &Triple) -> (&Term, &Term, &Term) {
        let Triple { s, p, o } = triple;
        match self {
            IndexOrder::Spo => (s, p, o),
            IndexOrder::Pos => (p, o, s),
            IndexOrder::Osp => (o, s, p),
            IndexOrder::Sop => (s, o, p),
            IndexOrder::Ops => (o, p, s),
            IndexOrder::Pso => (p, s, o),
        }
    }
}

/// Read access to a triple store through its six orderings.
///
/// The accessors are level-by-level (trunk keys, then branch keys under a
/// trunk, then the leaf set under a (trunk, branch) pair) so that callers
/// control traversal direction at every level and overlays can merge each
/// level independently.
pub trait TripleReader {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, triple: &Triple) -> bool;

    /// Trunk keys of the chosen ordering.
    fn trunks(&self, index: IndexOrder, order: Order) -> Box<dyn Iterator<Item = Term> + '_>;

    /// Number of triples sharing the given trunk key, or zero when absent.
    fn trunk_len(&self, index: IndexOrder, trunk: &Term) -> usize;

    /// Branch keys under a trunk key; empty when the trunk is absent.
    fn branches(
        &self,
        index: IndexOrder,
        trunk: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_>;

    /// The leaf set under a (trunk, branch) pair; empty when absent.
    fn leaf(
        &self,
        index: IndexOrder,
        trunk: &Term,
        branch: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_>;

    /// Every distinct term appearing in any position, in total order.
    fn terms(&self) -> Vec<Term>;

    /// All triples in natural (s, p, o) form, traversed over `spo`
    /// ascending.
    fn triples(&self) -> Box<dyn Iterator<Item = Triple> + '_>
    where
        Self: Sized,
    {
        Box::new(scan(self, IndexOrder::Spo, [Order::Ascending; 3]))
    }

    /// All triples in natural form, traversed over the chosen ordering and
    /// directions.
    fn triples_in(
        &self,
        index: IndexOrder,
        orders: [Order; 3],
    ) -> Box<dyn Iterator<Item = Triple> + '_>
    where
        Self: Sized,
    {
        Box::new(scan(self, index, orders))
    }

    /// Position of a triple in the `spo` traversal; `None` when absent.
    fn position(&self, triple: &Triple) -> Option<usize>
    where
        Self: Sized,
    {
        self.triples().position(|t| t == *triple)
    }
}

/// Write access. Implemented by stores that manage their own notion of
/// time: the plain in-memory hexastore and the WAL-backed store.
pub trait TripleWriter: TripleReader {
    /// Idempotent insert; `true` when the triple was new.
    fn insert(&mut self, triple: Triple) -> Result<bool>;

    /// Sorts the batch once, streams it grouped by subject and predicate,
    /// and returns the number of triples that were actually new.
    fn bulk_insert(&mut self, triples: Vec<Triple>) -> Result<usize>;

    /// Removes a triple from all six orderings; absent triples are a
    /// no-op. `true` when something was removed.
    fn delete(&mut self, triple: &Triple) -> Result<bool>;
}

/// Lazily walks one ordering of a store, yielding natural triples.
pub fn scan<'a, S: TripleReader + ?Sized>(
    store: &'a S,
    index: IndexOrder,
    orders: [Order; 3],
) -> impl Iterator<Item = Triple> + 'a {
    store.trunks(index, orders[0]).flat_map(move |t1| {
        store.branches(index, &t1, orders[1]).flat_map(move |t2| {
            let t1 = t1.clone();
            store
                .leaf(index, &t1, &t2, orders[2])
                .map(move |t3| index.to_natural(t1.clone(), t2.clone(), t3))
        })
    })
}

/// Merges two ascending-or-descending key streams, yielding each key once;
/// ties advance both sides.
pub(crate) struct MergedTerms<'a> {
    left: std::iter::Peekable<Box<dyn Iterator<Item = Term> + 'a>>,
    right: std::iter::Peekable<Box<dyn Iterator<Item = Term> + 'a>>,
    order: Order,
}

impl<'a> MergedTerms<'a> {
    pub(crate) fn new(
        left: Box<dyn Iterator<Item = Term> + 'a>,
        right: Box<dyn Iterator<Item = Term> + 'a>,
        order: Order,
    ) -> Self {
        MergedTerms {
            left: left.peekable(),
            right: right.peekable(),
            order,
        }
    }
}

impl Iterator for MergedTerms<'_> {
    type Item = Term;

    fn next(&mut self) -> Option<Term> {
        use std::cmp::Ordering::*;

        match (self.left.peek(), self.right.peek()) {
            (None, None) => None,
            (Some(_), None) => self.left.next(),
            (None, Some(_)) => self.right.next(),
            (Some(l), Some(r)) => {
                let ordering = match self.order {
                    Order::Ascending => l.cmp(r),
                    Order::Descending => r.cmp(l),
                };
                match ordering {
                    Less => self.left.next(),
                    Greater => self.right.next(),
                    Equal => {
                        self.right.next();
                        self.left.next()
                    }
                }
            }
        }
    }
}
