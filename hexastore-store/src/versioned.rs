use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use hexastore_model::{Order, Term, Triple};

use crate::reader::{IndexOrder, TripleReader};
use crate::sorted::SortedMap;

/// One validity interval of a triple: present from `valid_from` until
/// `valid_to`, with `None` meaning an open end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TripleStatusItem {
    pub valid_from: Option<u64>,
    pub valid_to: Option<u64>,
}

/// The full insert/delete history of a triple, newest interval last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TripleStatus {
    pub statuses: Vec<TripleStatusItem>,
}

impl TripleStatus {
    /// Currently inserted iff the last interval is still open.
    pub fn inserted(&self) -> bool {
        matches!(
            self.statuses.last(),
            Some(TripleStatusItem { valid_to: None, .. })
        )
    }
}

type Status = Rc<RefCell<TripleStatus>>;
type VLeaf = Rc<RefCell<SortedMap<Term, Status>>>;

#[derive(Debug, Clone, Default)]
struct TrunkPayload {
    branch: SortedMap<Term, VLeaf>,
    n: usize,
}

type Trunks = SortedMap<Term, TrunkPayload>;

/// The versioned hexastore: the same six-ordering shape as
/// [`crate::MemoryHexastore`], but each leaf maps a term to its status
/// history instead of holding a plain set. A triple's status is one shared
/// allocation, referenced from all three natural leaves, so the orderings
/// can never disagree about liveness.
///
/// Positions are supplied by the caller (the WAL layer passes its entry
/// index); interval lists grow without bound across insert/delete churn,
/// and compaction means materialising a fresh store.
#[derive(Debug, Default)]
pub struct VersionedHexastore {
    n_triples: usize,
    spo: Trunks,
    pos: Trunks,
    osp: Trunks,
    sop: Trunks,
    ops: Trunks,
    pso: Trunks,
}

fn new_vleaf() -> VLeaf {
    Rc::new(RefCell::new(SortedMap::new()))
}

fn vleaf_for(trunks: &mut Trunks, trunk: &Term, branch: &Term) -> VLeaf {
    let (_, payload) = trunks.get_or_set(trunk, TrunkPayload::default);
    let (_, leaf) = payload.branch.get_or_set(branch, new_vleaf);
    Rc::clone(leaf)
}

fn share_vleaf(trunks: &mut Trunks, trunk: &Term, branch: &Term, leaf: &VLeaf) {
    let (_, payload) = trunks.get_or_set(trunk, TrunkPayload::default);
    payload.branch.get_or_set(branch, || Rc::clone(leaf));
}

fn vleaf_of(trunks: &Trunks, trunk: &Term, branch: &Term) -> Option<VLeaf> {
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

impl VersionedHexastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new validity interval at `valid_from`. Returns `false`
    /// (leaving the history untouched) when the triple is already live.
    pub fn insert_at(&mut self, triple: Triple, valid_from: u64) -> bool {
        let Triple { s, p, o } = triple;

        let vleaf_spo = vleaf_for(&mut self.spo, &s, &p);
        let status = {
            let mut leaf = vleaf_spo.borrow_mut();
            let (_, status) = leaf.get_or_set(&o, || Rc::new(RefCell::new(TripleStatus::default())));
            Rc::clone(status)
        };
        if status.borrow().inserted() {
            return false;
        }
        status.borrow_mut().statuses.push(TripleStatusItem {
            valid_from: Some(valid_from),
            valid_to: None,
        });

        self.attach(&s, &p, &o, &vleaf_spo, &status);

        self.n_triples += 1;
        add_count(&mut self.spo, &s, 1);
        add_count(&mut self.sop, &s, 1);
        add_count(&mut self.pos, &p, 1);
        add_count(&mut self.pso, &p, 1);
        add_count(&mut self.osp, &o, 1);
        add_count(&mut self.ops, &o, 1);
        true
    }

    /// Sorted, grouped variant of [`Self::insert_at`]: one sort, then the
    /// per-(subject, predicate) leaf handle is reused across the group.
    pub fn bulk_insert_at(&mut self, mut triples: Vec<Triple>, valid_from: u64) -> usize {
        triples.sort();

        let mut total = 0usize;
        let mut i = 0;
        while i < triples.len() {
            let s = triples[i].s.clone();
            let p = triples[i].p.clone();
            let group_end = i + triples[i..].partition_point(|t| t.s == s && t.p == p);

            let vleaf_spo = vleaf_for(&mut self.spo, &s, &p);
            let mut group_count = 0usize;
            for triple in &triples[i..group_end] {
                let o = &triple.o;
                let status = {
                    let mut leaf = vleaf_spo.borrow_mut();
                    let (_, status) =
                        leaf.get_or_set(o, || Rc::new(RefCell::new(TripleStatus::default())));
                    Rc::clone(status)
                };
                if status.borrow().inserted() {
                    continue;
                }
                status.borrow_mut().statuses.push(TripleStatusItem {
                    valid_from: Some(valid_from),
                    valid_to: None,
                });

                self.attach(&s, &p, o, &vleaf_spo, &status);

                add_count(&mut self.osp, o, 1);
                add_count(&mut self.ops, o, 1);
                group_count += 1;
            }
            if group_count > 0 {
                add_count(&mut self.spo, &s, group_count);
                add_count(&mut self.sop, &s, group_count);
                add_count(&mut self.pos, &p, group_count);
                add_count(&mut self.pso, &p, group_count);
                self.n_triples += group_count;
                total += group_count;
            }
            i = group_end;
        }
        total
    }

    /// Closes the last validity interval at `valid_to`. The tombstone is
    /// recorded even for a triple that was never inserted, so a replayed
    /// log converges regardless of entry interleaving. Returns whether the
    /// triple was live beforehand.
    pub fn delete_at(&mut self, triple: &Triple, valid_to: u64) -> bool {
        let Triple { s, p, o } = triple;
        let was_live = self.contains(triple);

        if was_live {
            self.n_triples -= 1;
            sub_count(&mut self.spo, s, 1);
            sub_count(&mut self.sop, s, 1);
            sub_count(&mut self.pos, p, 1);
            sub_count(&mut self.pso, p, 1);
            sub_count(&mut self.osp, o, 1);
            sub_count(&mut self.ops, o, 1);
        }

        let vleaf_spo = vleaf_for(&mut self.spo, s, p);
        let status = {
            let mut leaf = vleaf_spo.borrow_mut();
            let (_, status) = leaf.get_or_set(o, || Rc::new(RefCell::new(TripleStatus::default())));
            Rc::clone(status)
        };
        {
            let mut status = status.borrow_mut();
            match status.statuses.last_mut() {
                Some(last) => last.valid_to = Some(valid_to),
                None => status.statuses.push(TripleStatusItem {
                    valid_from: None,
                    valid_to: Some(valid_to),
                }),
            }
        }

        self.attach(s, p, o, &vleaf_spo, &status);
        was_live
    }

    /// Registers the shared leaf and status under the remaining five
    /// orderings.
    fn attach(&mut self, s: &Term, p: &Term, o: &Term, vleaf_spo: &VLeaf, status: &Status) {
        share_vleaf(&mut self.pso, p, s, vleaf_spo);

        let vleaf_pos = vleaf_for(&mut self.pos, p, o);
        vleaf_pos
            .borrow_mut()
            .get_or_set(s, || Rc::clone(status));
        share_vleaf(&mut self.ops, o, p, &vleaf_pos);

        let vleaf_osp = vleaf_for(&mut self.osp, o, s);
        vleaf_osp
            .borrow_mut()
            .get_or_set(p, || Rc::clone(status));
        share_vleaf(&mut self.sop, s, o, &vleaf_osp);
    }

    /// The full status history of a triple, if any was ever recorded.
    pub fn status(&self, triple: &Triple) -> Option<TripleStatus> {
        let leaf = vleaf_of(&self.spo, &triple.s, &triple.p)?;
        let leaf = leaf.borrow();
        let status = leaf.get(&triple.o)?;
        Some(status.borrow().clone())
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

/// Walks a versioned leaf, yielding only currently-live terms.
struct VLeafIter {
    leaf: VLeaf,
    order: Order,
    position: usize,
    total: usize,
}

impl VLeafIter {
    fn new(leaf: VLeaf, order: Order) -> Self {
        let total = leaf.borrow().len();
        VLeafIter {
            leaf,
            order,
            position: 0,
            total,
        }
    }
}

impl Iterator for VLeafIter {
    type Item = Term;

    fn next(&mut self) -> Option<Term> {
        while self.position < self.total {
            let index = match self.order {
                Order::Ascending => self.position,
                Order::Descending => self.total - 1 - self.position,
            };
            self.position += 1;

            let leaf = self.leaf.borrow();
            if let Some((term, status)) = leaf.get_index(index) {
                if status.borrow().inserted() {
                    return Some(term.clone());
                }
            }
        }
        None
    }
}

impl TripleReader for VersionedHexastore {
    fn len(&self) -> usize {
        self.n_triples
    }

    fn contains(&self, triple: &Triple) -> bool {
        vleaf_of(&self.spo, &triple.s, &triple.p)
            .and_then(|leaf| {
                let leaf = leaf.borrow();
                leaf.get(&triple.o).map(|status| status.borrow().inserted())
            })
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
        match vleaf_of(self.index_map(index), trunk, branch) {
            Some(leaf) => Box::new(VLeafIter::new(leaf, order)),
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
