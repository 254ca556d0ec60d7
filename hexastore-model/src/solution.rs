use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::term::{Term, Triple, Variable};

/// Iteration / sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

/// One ORDER BY entry: a variable and its direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderCondition {
    pub variable: Variable,
    pub direction: Order,
}

impl OrderCondition {
    pub fn asc(variable: impl Into<String>) -> Self {
        OrderCondition {
            variable: Variable::new(variable),
            direction: Order::Ascending,
        }
    }

    pub fn desc(variable: impl Into<String>) -> Self {
        OrderCondition {
            variable: Variable::new(variable),
            direction: Order::Descending,
        }
    }
}

/// A set of variable bindings, the order-by descriptor it was produced
/// under, and the source triples that justify it.
///
/// Solutions are immutable by convention: `merge` and `extend` return new
/// solutions rather than mutating in place.
#[derive(Clone)]
pub struct Solution {
    bindings: BTreeMap<Variable, Term>,
    order_by: Rc<Vec<OrderCondition>>,
    triples: BTreeSet<Triple>,
}

impl Solution {
    pub fn new(
        bindings: BTreeMap<Variable, Term>,
        order_by: Rc<Vec<OrderCondition>>,
        triples: BTreeSet<Triple>,
    ) -> Self {
        Solution {
            bindings,
            order_by,
            triples,
        }
    }

    pub fn empty(order_by: Rc<Vec<OrderCondition>>) -> Self {
        Solution {
            bindings: BTreeMap::new(),
            order_by,
            triples: BTreeSet::new(),
        }
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.bindings.get(variable)
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.bindings.contains_key(variable)
    }

    pub fn bindings(&self) -> &BTreeMap<Variable, Term> {
        &self.bindings
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.bindings.keys()
    }

    pub fn triples(&self) -> &BTreeSet<Triple> {
        &self.triples
    }

    pub fn order_by(&self) -> &Rc<Vec<OrderCondition>> {
        &self.order_by
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Merges two solutions: the pointwise union of bindings and the union
    /// of provenance. A variable bound to different terms on both sides is
    /// a contract violation.
    pub fn merge(&self, other: &Solution) -> Result<Solution> {
        let mut bindings = self.bindings.clone();
        for (variable, term) in &other.bindings {
            match bindings.get(variable) {
                Some(existing) if existing != term => {
                    return Err(Error::ConflictingBinding {
                        variable: variable.name().to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    bindings.insert(variable.clone(), term.clone());
                }
            }
        }
        let mut triples = self.triples.clone();
        triples.extend(other.triples.iter().cloned());
        Ok(Solution {
            bindings,
            order_by: Rc::clone(&self.order_by),
            triples,
        })
    }

    /// Adds bindings without touching provenance. Used by aggregates to
    /// attach output variables to a group key.
    pub fn extend(
        &self,
        new_bindings: impl IntoIterator<Item = (Variable, Term)>,
    ) -> Result<Solution> {
        let mut bindings = self.bindings.clone();
        for (variable, term) in new_bindings {
            match bindings.get(&variable) {
                Some(existing) if *existing != term => {
                    return Err(Error::ConflictingBinding {
                        variable: variable.name().to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    bindings.insert(variable, term);
                }
            }
        }
        Ok(Solution {
            bindings,
            order_by: Rc::clone(&self.order_by),
            triples: self.triples.clone(),
        })
    }

    /// Keeps only the listed variables. Provenance is retained.
    pub fn project(&self, variables: &[Variable]) -> Solution {
        let bindings = self
            .bindings
            .iter()
            .filter(|(v, _)| variables.contains(*v))
            .map(|(v, t)| (v.clone(), t.clone()))
            .collect();
        Solution {
            bindings,
            order_by: Rc::clone(&self.order_by),
            triples: self.triples.clone(),
        }
    }

    /// Compares two solutions: declared order conditions first (an unbound
    /// variable sorts lowest), then every remaining variable in name order
    /// under the cross-type key.
    pub fn compare(&self, other: &Solution) -> Ordering {
        let mut remaining: BTreeSet<&Variable> = self.bindings.keys().collect();
        remaining.extend(other.bindings.keys());

        for condition in self.order_by.iter() {
            remaining.remove(&condition.variable);

            let lhs = self.get(&condition.variable);
            let rhs = other.get(&condition.variable);
            let ordering = match condition.direction {
                Order::Ascending => lhs.cmp(&rhs),
                Order::Descending => rhs.cmp(&lhs),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        for variable in remaining {
            let ordering = self.get(variable).cmp(&other.get(variable));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }

    /// Binding-level equality, ignoring provenance. Used by DISTINCT.
    pub fn same_bindings(&self, other: &Solution) -> bool {
        self.bindings == other.bindings
    }
}

impl PartialEq for Solution {
    fn eq(&self, other: &Self) -> bool {
        self.bindings == other.bindings && self.triples == other.triples
    }
}

impl Eq for Solution {}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (v, t) in &self.bindings {
            map.entry(&format_args!("{v}"), &format_args!("{t}"));
        }
        map.finish()
    }
}
