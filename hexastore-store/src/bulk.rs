use std::collections::BTreeSet;

use hexastore_model::{Order, Term, Triple};

use crate::error::Result;
use crate::memory::MemoryHexastore;
use crate::reader::{IndexOrder, MergedTerms, TripleReader, TripleWriter};

/// A read-through write buffer over a store.
///
/// Writes land in a fresh in-memory overlay; reads merge the underlying
/// store and the overlay key-by-key at every level, each key yielded once.
/// The reasoner runs whole saturation batches against one of these so the
/// underlying indexes pay a single bulk insert per batch.
///
/// Call [`BulkInserter::commit`] to flush the overlay into the underlying
/// store; dropping without committing discards it, which is what an error
/// path wants. The exclusive borrow keeps the underlying store from being
/// written to directly while the overlay is live.
pub struct BulkInserter<'a, S: TripleWriter> {
    underlying: &'a mut S,
    overlay: MemoryHexastore,
}

impl<'a, S: TripleWriter> BulkInserter<'a, S> {
    pub fn new(underlying: &'a mut S) -> Self {
        BulkInserter {
            underlying,
            overlay: MemoryHexastore::new(),
        }
    }

    /// `true` when the triple is new to both the underlying store and the
    /// overlay.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.underlying.contains(&triple) {
            return false;
        }
        self.overlay.insert(triple)
    }

    pub fn bulk_insert(&mut self, triples: Vec<Triple>) -> usize {
        self.overlay.bulk_insert(triples)
    }

    pub fn overlay(&self) -> &MemoryHexastore {
        &self.overlay
    }

    /// Flushes the overlay into the underlying store and returns how many
    /// triples the underlying store actually gained.
    pub fn commit(self) -> Result<usize> {
        let staged: Vec<Triple> = self.overlay.triples().collect();
        if staged.is_empty() {
            return Ok(0);
        }
        self.underlying.bulk_insert(staged)
    }
}

impl<S: TripleWriter> TripleReader for BulkInserter<'_, S> {
    fn len(&self) -> usize {
        self.underlying.len() + self.overlay.len()
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.overlay.contains(triple) || self.underlying.contains(triple)
    }

    fn trunks(&self, index: IndexOrder, order: Order) -> Box<dyn Iterator<Item = Term> + '_> {
        Box::new(MergedTerms::new(
            self.underlying.trunks(index, order),
            self.overlay.trunks(index, order),
            order,
        ))
    }

    fn trunk_len(&self, index: IndexOrder, trunk: &Term) -> usize {
        self.underlying.trunk_len(index, trunk) + self.overlay.trunk_len(index, trunk)
    }

    fn branches(
        &self,
        index: IndexOrder,
        trunk: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        Box::new(MergedTerms::new(
            self.underlying.branches(index, trunk, order),
            self.overlay.branches(index, trunk, order),
            order,
        ))
    }

    fn leaf(
        &self,
        index: IndexOrder,
        trunk: &Term,
        branch: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        Box::new(MergedTerms::new(
            self.underlying.leaf(index, trunk, branch, order),
            self.overlay.leaf(index, trunk, branch, order),
            order,
        ))
    }

    fn terms(&self) -> Vec<Term> {
        let mut terms: BTreeSet<Term> = self.underlying.terms().into_iter().collect();
        terms.extend(self.overlay.terms());
        terms.into_iter().collect()
    }
}
