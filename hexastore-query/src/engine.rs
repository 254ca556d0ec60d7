use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use hexastore_model::{
    Order, OrderCondition, Solution, Term, TermPattern, Triple, TriplePattern, Variable,
};
use hexastore_store::{IndexOrder, TripleReader};
use tracing::trace;

use crate::error::Result;

/// Per-execution counters. `triples_visited` increments exactly once per
/// leaf element actually consumed, whether or not it produced a solution;
/// lookups that short-circuit on an absent key contribute nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub triples_visited: u64,
}

/// Matches a conjunction of triple patterns against a store.
///
/// Patterns are reordered ascending by their free-variable count after the
/// caller's bindings are substituted, so the most selective pattern runs
/// first. Each pattern is matched by picking the one ordering of the six
/// whose outermost keys are the pattern's constants, with variable levels
/// arranged by ORDER BY rank, so results come back pre-ordered to the
/// extent the index allows. The final solution list is sorted under
/// `order_by`.
pub fn execute<S: TripleReader + ?Sized>(
    store: &S,
    patterns: &[TriplePattern],
    order_by: &[OrderCondition],
    bindings: Option<&Solution>,
) -> Result<(Vec<Solution>, Stats)> {
    let order_by = Rc::new(order_by.to_vec());
    let initial = match bindings {
        Some(solution) => solution.clone(),
        None => Solution::empty(Rc::clone(&order_by)),
    };

    let mut engine = Engine {
        store,
        ranks: order_by
            .iter()
            .enumerate()
            .map(|(rank, c)| (c.variable.name().to_string(), (rank, c.direction)))
            .collect(),
        sentinel: order_by.len(),
        order_by,
        stats: Stats::default(),
    };

    let solutions = engine.run(patterns, initial)?;
    Ok((solutions, engine.stats))
}

struct Engine<'a, S: ?Sized> {
    store: &'a S,
    order_by: Rc<Vec<OrderCondition>>,
    ranks: HashMap<String, (usize, Order)>,
    sentinel: usize,
    stats: Stats,
}

/// One pattern slot after classification: a constant, or a variable
/// carrying its ORDER BY rank and direction (`(sentinel, ascending)` when
/// the variable is not ordered on).
enum Slot<'p> {
    Const(&'p Term),
    Var {
        variable: &'p Variable,
        rank: usize,
        direction: Order,
    },
}

impl Slot<'_> {
    fn sort_key(&self) -> (u8, usize, &str) {
        match self {
            Slot::Const(_) => (0, 0, ""),
            Slot::Var { variable, rank, .. } => (1, *rank, variable.name()),
        }
    }
}

impl<'a, S: TripleReader + ?Sized> Engine<'a, S> {
    fn run(&mut self, patterns: &[TriplePattern], initial: Solution) -> Result<Vec<Solution>> {
        if patterns.is_empty() {
            return Ok(vec![initial]);
        }

        let mut resolved: Vec<TriplePattern> =
            patterns.iter().map(|p| p.resolve(&initial)).collect();
        resolved.sort_by_key(TriplePattern::variable_count);

        let mut solutions = vec![initial];
        for pattern in &resolved {
            let mut joined = Vec::new();
            for solution in &solutions {
                let concrete = pattern.resolve(solution);
                for matched in self.match_pattern(&concrete)? {
                    joined.push(solution.merge(&matched)?);
                }
            }
            solutions = joined;
            if solutions.is_empty() {
                break;
            }
        }

        solutions.sort_by(|a, b| a.compare(b));
        Ok(solutions)
    }

    fn classify<'p>(&self, slot: &'p TermPattern) -> Slot<'p> {
        match slot {
            TermPattern::Term(term) => Slot::Const(term),
            TermPattern::Variable(variable) => {
                let (rank, direction) = self
                    .ranks
                    .get(variable.name())
                    .copied()
                    .unwrap_or((self.sentinel, Order::Ascending));
                Slot::Var {
                    variable,
                    rank,
                    direction,
                }
            }
        }
    }

    /// Matches one pattern, choosing the index whose traversal puts the
    /// pattern's constants outermost and its lowest-ranked order-by
    /// variable next.
    fn match_pattern(&mut self, pattern: &TriplePattern) -> Result<Vec<Solution>> {
        trace!(%pattern, "matching pattern");
        let store = self.store;

        let mut slots: Vec<(Slot<'_>, usize)> = pattern
            .slots()
            .into_iter()
            .map(|slot| self.classify(slot))
            .zip(0usize..)
            .collect();
        slots.sort_by(|(a, _), (b, _)| a.sort_key().cmp(&b.sort_key()));

        let index = match [slots[0].1, slots[1].1, slots[2].1] {
            [0, 1, 2] => IndexOrder::Spo,
            [1, 2, 0] => IndexOrder::Pos,
            [2, 0, 1] => IndexOrder::Osp,
            [0, 2, 1] => IndexOrder::Sop,
            [2, 1, 0] => IndexOrder::Ops,
            [1, 0, 2] => IndexOrder::Pso,
            _ => unreachable!("positions are a permutation"),
        };

        let mut solutions = Vec::new();
        match (&slots[0].0, &slots[1].0, &slots[2].0) {
            (Slot::Const(_), Slot::Const(_), Slot::Const(_)) => {
                let triple = pattern.ground().expect("three constant slots");
                if store.contains(&triple) {
                    self.stats.triples_visited += 1;
                    solutions.push(self.solution(&[], triple));
                }
            }
            (Slot::Const(t1), Slot::Const(t2), Slot::Var { variable, direction, .. }) => {
                for t3 in store.leaf(index, t1, t2, *direction) {
                    self.stats.triples_visited += 1;
                    let triple = index.to_natural((*t1).clone(), (*t2).clone(), t3.clone());
                    solutions.push(self.solution(&[(*variable, &t3)], triple));
                }
            }
            (
                Slot::Const(t1),
                Slot::Var {
                    variable: v2,
                    direction: d2,
                    ..
                },
                Slot::Var {
                    variable: v3,
                    direction: d3,
                    ..
                },
            ) => {
                for t2 in store.branches(index, t1, *d2) {
                    for t3 in store.leaf(index, t1, &t2, *d3) {
                        self.stats.triples_visited += 1;
                        if let Some(solution) = self.try_solution(
                            &[(*v2, &t2), (*v3, &t3)],
                            index.to_natural((*t1).clone(), t2.clone(), t3.clone()),
                        ) {
                            solutions.push(solution);
                        }
                    }
                }
            }
            (
                Slot::Var {
                    variable: v1,
                    direction: d1,
                    ..
                },
                Slot::Var {
                    variable: v2,
                    direction: d2,
                    ..
                },
                Slot::Var {
                    variable: v3,
                    direction: d3,
                    ..
                },
            ) => {
                for t1 in store.trunks(index, *d1) {
                    for t2 in store.branches(index, &t1, *d2) {
                        for t3 in store.leaf(index, &t1, &t2, *d3) {
                            self.stats.triples_visited += 1;
                            if let Some(solution) = self.try_solution(
                                &[(*v1, &t1), (*v2, &t2), (*v3, &t3)],
                                index.to_natural(t1.clone(), t2.clone(), t3.clone()),
                            ) {
                                solutions.push(solution);
                            }
                        }
                    }
                }
            }
            _ => unreachable!("constants sort before variables"),
        }

        Ok(solutions)
    }

    fn solution(&self, pairs: &[(&Variable, &Term)], source: Triple) -> Solution {
        self.try_solution(pairs, source)
            .expect("distinct variables cannot disagree")
    }

    /// Builds a solution from matched slots; `None` when a variable
    /// repeated within the pattern matched two different terms.
    fn try_solution(&self, pairs: &[(&Variable, &Term)], source: Triple) -> Option<Solution> {
        let mut bindings: BTreeMap<Variable, Term> = BTreeMap::new();
        for (variable, term) in pairs {
            match bindings.get(*variable) {
                Some(existing) if existing != *term => return None,
                Some(_) => {}
                None => {
                    bindings.insert((*variable).clone(), (*term).clone());
                }
            }
        }
        Some(Solution::new(
            bindings,
            Rc::clone(&self.order_by),
            BTreeSet::from([source]),
        ))
    }
}
