use std::path::{Path, PathBuf};

use hexastore_model::{BlankNodeFactory, Order, Term, Triple};
use hexastore_store::{
    IndexOrder, TripleReader, TripleStatus, TripleWriter, VersionedHexastore, Wal, WalEntry,
};

use crate::error::Result;

/// A WAL-backed versioned hexastore.
///
/// Opening replays the log into a fresh [`VersionedHexastore`], using each
/// entry's log position as its validity timestamp. Mutations append to
/// the log first and then apply at the returned position, so a crash
/// between the two replays to the same state.
///
/// Interval histories grow without bound across insert/delete churn;
/// [`Store::compact_to`] rewrites only the currently-live triples into a
/// fresh store and log.
pub struct Store {
    memory: VersionedHexastore,
    wal: Wal,
    factory: BlankNodeFactory,
    path: PathBuf,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let factory = BlankNodeFactory::new();
        let (wal, entries) = Wal::open(&path, &factory)?;

        let mut memory = VersionedHexastore::new();
        for (position, entry) in entries.into_iter().enumerate() {
            let position = position as u64;
            match entry {
                WalEntry::Insert(triple) => {
                    memory.insert_at(triple, position);
                }
                WalEntry::BulkInsert(triples) => {
                    memory.bulk_insert_at(triples, position);
                }
                WalEntry::Delete(triple) => {
                    memory.delete_at(&triple, position);
                }
            }
        }

        Ok(Store {
            memory,
            wal,
            factory,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The next log position to be assigned.
    pub fn log_index(&self) -> u64 {
        self.wal.len()
    }

    /// The factory used for blank nodes decoded from the log; parsers
    /// feeding this store should mint their blank nodes here too.
    pub fn blank_node_factory(&self) -> &BlankNodeFactory {
        &self.factory
    }

    /// The full validity history of a triple, if one was ever recorded.
    pub fn status(&self, triple: &Triple) -> Option<TripleStatus> {
        self.memory.status(triple)
    }

    /// Writes only the currently-live triples into a fresh store at
    /// `path`, dropping dead intervals and tombstones.
    pub fn compact_to(&self, path: impl AsRef<Path>) -> Result<Store> {
        let mut fresh = Store::open(path)?;
        let live: Vec<Triple> = self.memory.triples().collect();
        if !live.is_empty() {
            TripleWriter::bulk_insert(&mut fresh, live)?;
        }
        Ok(fresh)
    }
}

impl TripleReader for Store {
    fn len(&self) -> usize {
        self.memory.len()
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.memory.contains(triple)
    }

    fn trunks(&self, index: IndexOrder, order: Order) -> Box<dyn Iterator<Item = Term> + '_> {
        self.memory.trunks(index, order)
    }

    fn trunk_len(&self, index: IndexOrder, trunk: &Term) -> usize {
        self.memory.trunk_len(index, trunk)
    }

    fn branches(
        &self,
        index: IndexOrder,
        trunk: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        self.memory.branches(index, trunk, order)
    }

    fn leaf(
        &self,
        index: IndexOrder,
        trunk: &Term,
        branch: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        self.memory.leaf(index, trunk, branch, order)
    }

    fn terms(&self) -> Vec<Term> {
        self.memory.terms()
    }
}

impl TripleWriter for Store {
    fn insert(&mut self, triple: Triple) -> hexastore_store::Result<bool> {
        let position = self.wal.append(&WalEntry::Insert(triple.clone()))?;
        Ok(self.memory.insert_at(triple, position))
    }

    fn bulk_insert(&mut self, triples: Vec<Triple>) -> hexastore_store::Result<usize> {
        let position = self.wal.append(&WalEntry::BulkInsert(triples.clone()))?;
        Ok(self.memory.bulk_insert_at(triples, position))
    }

    fn delete(&mut self, triple: &Triple) -> hexastore_store::Result<bool> {
        let position = self.wal.append(&WalEntry::Delete(triple.clone()))?;
        Ok(self.memory.delete_at(triple, position))
    }
}
