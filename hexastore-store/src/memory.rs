use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use hexastore_model::{Order, Term, Triple};

use crate::error::Result;
use crate::reader::{IndexOrder, TripleReader, TripleWriter};
use crate::sorted::{SortedList, SortedMap};

pub(crate) type Leaf = Rc<RefCell<SortedList<Term>>>;

/// The value under one trunk key: the branch mapping and the number of
/// triples sharing the trunk key.
#[derive(Debug, Clone, Default)]
struct TrunkPayload {
    branch: SortedMap<Term, Leaf>,
    n: usize,
}

type Trunks = SortedMap<Term, TrunkPayload>;

/// The plain in-memory hexastore.
///
/// The natural orderings (`spo`, `pos`, `osp`) own the leaf sets; the
/// paired reverse orderings (`pso`, `ops`, `sop`) hold the same `Rc`
/// allocations under swapped trunk/branch keys, so membership can never
/// disagree between an ordering and its pair.
#[derive(Debug, Default)]
pub struct MemoryHexastore {
    n_triples: usize,
    spo: Trunks,
    pos: Trunks,
    osp: Trunks,
    sop: Trunks,
    ops: Trunks,
    pso: Trunks,
}

fn new_leaf() -> Leaf {
    Rc::new(RefCell::new(SortedList::new()))
}

fn leaf_for(trunks: &mut Trunks, trunk: &Term, branch: &Term) -> Leaf {
    let (_, payload) = trunks.get_or_set(trunk, TrunkPayload::default);
    let (_, leaf) = payload.branch.get_or_set(branch, new_leaf);
    Rc::clone(leaf)
}

fn share_leaf(trunks: &mut Trunks, trunk: &Term, branch: &Term, leaf: &Leaf) {
    let (_, payload) = trunks.get_or_set(trunk, TrunkPayload::default);
    payload.branch.get_or_set(branch, || Rc::clone(leaf));
}

fn leaf_of(trunks: &Trunks, trunk: &Term, branch: &Term) -> Option<Leaf> {
    trunks.get(trunk)?.branch.get(branch).map(Rc::clone)
}

fn add_count(trunks: &mut Trunks, trunk: &Term, by: usize) {
    if let Some(payload) = trunks.get_mut(trunk) {
        payload.n += by;
    }
}

fn sub_count(trunks: &mut Trunks, trunk: &Term, by: usize) {
    if let Some(payload) = trunks.get_mut(trunk) {
        payload.n -= by;
    }
}

impl MemoryHexastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent insert; `true` when the triple was new. All six trunk
    /// counts move together.
    pub fn insert(&mut self, triple: Triple) -> bool {
        let Triple { s, p, o } = triple;

        let leaf_spo = leaf_for(&mut self.spo, &s, &p);
        let (_, inserted) = leaf_spo.borrow_mut().index_or_insert(o.clone(), 0);
        if !inserted {
            return false;
        }
        share_leaf(&mut self.pso, &p, &s, &leaf_spo);

        let leaf_pos = leaf_for(&mut self.pos, &p, &o);
        leaf_pos.borrow_mut().index_or_insert(s.clone(), 0);
        share_leaf(&mut self.ops, &o, &p, &leaf_pos);

        let leaf_osp = leaf_for(&mut self.osp, &o, &s);
        leaf_osp.borrow_mut().index_or_insert(p.clone(), 0);
        share_leaf(&mut self.sop, &s, &o, &leaf_osp);

        self.n_triples += 1;
        add_count(&mut self.spo, &s, 1);
        add_count(&mut self.sop, &s, 1);
        add_count(&mut self.pos, &p, 1);
        add_count(&mut self.pso, &p, 1);
        add_count(&mut self.osp, &o, 1);
        add_count(&mut self.ops, &o, 1);
        true
    }

    /// Sorts the batch into natural triple order once, then streams it
    /// grouped by subject and predicate so the per-group branch and leaf
    /// handles are reused and in-order input hits the append fast-path.
    /// Returns the number of new triples; duplicates are no-ops.
    pub fn bulk_insert(&mut self, mut triples: Vec<Triple>) -> usize {
        triples.sort();

        let mut total = 0usize;
        let mut i = 0;
        while i < triples.len() {
            let s = triples[i].s.clone();
            let s_end = i + triples[i..].partition_point(|t| t.s == s);

            let mut s_count = 0usize;
            let mut j = i;
            while j < s_end {
                let p = triples[j].p.clone();
                let p_end = j + triples[j..s_end].partition_point(|t| t.p == p);

                let leaf_spo = leaf_for(&mut self.spo, &s, &p);
                let mut shared = false;
                let mut hint = 0;
                let mut p_count = 0usize;
                for triple in &triples[j..p_end] {
                    let o = &triple.o;
                    let (position, inserted) =
                        leaf_spo.borrow_mut().index_or_insert(o.clone(), hint);
                    hint = position + 1;
                    if !inserted {
                        continue;
                    }
                    if !shared {
                        share_leaf(&mut self.pso, &p, &s, &leaf_spo);
                        shared = true;
                    }

                    let leaf_pos = leaf_for(&mut self.pos, &p, o);
                    leaf_pos.borrow_mut().index_or_insert(s.clone(), 0);
                    share_leaf(&mut self.ops, o, &p, &leaf_pos);

                    let leaf_osp = leaf_for(&mut self.osp, o, &s);
                    leaf_osp.borrow_mut().index_or_insert(p.clone(), 0);
                    share_leaf(&mut self.sop, &s, o, &leaf_osp);

                    add_count(&mut self.osp, o, 1);
                    add_count(&mut self.ops, o, 1);
                    p_count += 1;
                }
                if p_count > 0 {
                    add_count(&mut self.pos, &p, p_count);
                    add_count(&mut self.pso, &p, p_count);
                }
                s_count += p_count;
                j = p_end;
            }
            if s_count > 0 {
                add_count(&mut self.spo, &s, s_count);
                add_count(&mut self.sop, &s, s_count);
                self.n_triples += s_count;
                total += s_count;
            }
            i = s_end;
        }
        total
    }

    /// Removes a triple from all six orderings; absent triples are a
    /// no-op.
    pub fn delete(&mut self, triple: &Triple) -> bool {
        let Triple { s, p, o } = triple;
        let Some(leaf_spo) = leaf_of(&self.spo, s, p) else {
            return false;
        };
        if !leaf_spo.borrow_mut().remove(o) {
            return false;
        }
        if let Some(leaf_pos) = leaf_of(&self.pos, p, o) {
            leaf_pos.borrow_mut().remove(s);
        }
        if let Some(leaf_osp) = leaf_of(&self.osp, o, s) {
            leaf_osp.borrow_mut().remove(p);
        }

        self.n_triples -= 1;
        sub_count(&mut self.spo, s, 1);
        sub_count(&mut self.sop, s, 1);
        sub_count(&mut self.pos, p, 1);
        sub_count(&mut self.pso, p, 1);
        sub_count(&mut self.osp, o, 1);
        sub_count(&mut self.ops, o, 1);
        true
    }

    fn index_map(&self, index: IndexOrder) -> &Trunks {
        match index {
            IndexOrder::Spo => &self.spo,
            IndexOrder::Pos => &self.pos,
            IndexOrder::Osp => &self.osp,
            IndexOrder::Sop => &self.sop,
            IndexOrder::Ops => &self.ops,
            IndexOrder::Pso => &self.pso,
        }
    }
}

/// Yields leaf terms in the requested direction. Owns its `Rc`, borrowing
/// the cell only transiently per step, so callers may interleave reads.
struct LeafIter {
    leaf: Leaf,
    order: Order,
    position: usize,
    total: usize,
}

impl LeafIter {
    fn new(leaf: Leaf, order: Order) -> Self {
        let total = leaf.borrow().len();
        LeafIter {
            leaf,
            order,
            position: 0,
            total,
        }
    }
}

impl Iterator for LeafIter {
    type Item = Term;

    fn next(&mut self) -> Option<Term> {
        if self.position >= self.total {
            return None;
        }
        let index = match self.order {
            Order::Ascending => self.position,
            Order::Descending => self.total - 1 - self.position,
        };
        self.position += 1;
        self.leaf.borrow().get(index).cloned()
    }
}

impl TripleReader for MemoryHexastore {
    fn len(&self) -> usize {
        self.n_triples
    }

    fn contains(&self, triple: &Triple) -> bool {
        leaf_of(&self.spo, &triple.s, &triple.p)
            .map(|leaf| leaf.borrow().contains(&triple.o))
            .unwrap_or(false)
    }

    fn trunks(&self, index: IndexOrder, order: Order) -> Box<dyn Iterator<Item = Term> + '_> {
        Box::new(
            self.index_map(index)
                .items(order)
                .map(|(key, _)| key.clone()),
        )
    }

    fn trunk_len(&self, index: IndexOrder, trunk: &Term) -> usize {
        self.index_map(index)
            .get(trunk)
            .map(|payload| payload.n)
            .unwrap_or(0)
    }

    fn branches(
        &self,
        index: IndexOrder,
        trunk: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        match self.index_map(index).get(trunk) {
            Some(payload) => Box::new(payload.branch.items(order).map(|(key, _)| key.clone())),
            None => Box::new(std::iter::empty()),
        }
    }

    fn leaf(
        &self,
        index: IndexOrder,
        trunk: &Term,
        branch: &Term,
        order: Order,
    ) -> Box<dyn Iterator<Item = Term> + '_> {
        match leaf_of(self.index_map(index), trunk, branch) {
            Some(leaf) => Box::new(LeafIter::new(leaf, order)),
            None => Box::new(std::iter::empty()),
        }
    }

    fn terms(&self) -> Vec<Term> {
        let mut terms: BTreeSet<Term> = BTreeSet::new();
        for trunks in [&self.spo, &self.pos, &self.osp] {
            terms.extend(trunks.keys().iter().cloned());
        }
        terms.into_iter().collect()
    }
}

impl TripleWriter for MemoryHexastore {
    fn insert(&mut self, triple: Triple) -> Result<bool> {
        Ok(MemoryHexastore::insert(self, triple))
    }

    fn bulk_insert(&mut self, triples: Vec<Triple>) -> Result<usize> {
        Ok(MemoryHexastore::bulk_insert(self, triples))
    }

    fn delete(&mut self, triple: &Triple) -> Result<bool> {
        Ok(MemoryHexastore::delete(self, triple))
    }
}
