use std::rc::Rc;

use hexastore_model::{OrderCondition, Solution, TriplePattern, Variable};
use hexastore_store::TripleReader;

use crate::aggregate::Aggregate;
use crate::engine::{Stats, execute};
use crate::error::Result;

/// A tree of algebraic operators over triple patterns.
///
/// `LeftJoin` extends each left solution with matches of the right-hand
/// pattern list, passing the left solution through untouched when nothing
/// matches. `Reduced` is a deduplication hint and shares `Distinct`'s
/// implementation.
pub enum Operator {
    Bgp {
        patterns: Vec<TriplePattern>,
        limit: Option<usize>,
    },
    LeftJoin {
        lhs: Box<Operator>,
        rhs: Vec<TriplePattern>,
    },
    Filter {
        inner: Box<Operator>,
        predicate: Rc<dyn Fn(&Solution) -> bool>,
    },
    Project {
        variables: Vec<Variable>,
        inner: Box<Operator>,
    },
    Distinct {
        inner: Box<Operator>,
    },
    Reduced {
        inner: Box<Operator>,
    },
    Limit {
        inner: Box<Operator>,
        limit: usize,
    },
    GroupAggregate {
        keys: Vec<Variable>,
        aggregate: Aggregate,
        inner: Box<Operator>,
    },
}

impl Operator {
    pub fn bgp(patterns: Vec<TriplePattern>) -> Self {
        Operator::Bgp {
            patterns,
            limit: None,
        }
    }
}

/// Evaluates an operator tree. `order_by` drives both index selection
/// inside BGPs and the final sort of every solution-producing node.
pub fn evaluate<S: TripleReader + ?Sized>(
    store: &S,
    operator: &Operator,
    order_by: &[OrderCondition],
) -> Result<(Vec<Solution>, Stats)> {
    let mut stats = Stats::default();
    let solutions = eval(store, operator, order_by, &mut stats)?;
    Ok((solutions, stats))
}

fn eval<S: TripleReader + ?Sized>(
    store: &S,
    operator: &Operator,
    order_by: &[OrderCondition],
    stats: &mut Stats,
) -> Result<Vec<Solution>> {
    match operator {
        Operator::Bgp { patterns, limit } => {
            let (mut solutions, bgp_stats) = execute(store, patterns, order_by, None)?;
            stats.triples_visited += bgp_stats.triples_visited;
            if let Some(limit) = limit {
                solutions.truncate(*limit);
            }
            Ok(solutions)
        }
        Operator::LeftJoin { lhs, rhs } => {
            let mut joined = Vec::new();
            for solution in eval(store, lhs, order_by, stats)? {
                let (extended, rhs_stats) = execute(store, rhs, order_by, Some(&solution))?;
                stats.triples_visited += rhs_stats.triples_visited;
                if extended.is_empty() {
                    joined.push(solution);
                } else {
                    joined.extend(extended);
                }
            }
            joined.sort_by(|a, b| a.compare(b));
            Ok(joined)
        }
        Operator::Filter { inner, predicate } => {
            let solutions = eval(store, inner, order_by, stats)?;
            Ok(solutions
                .into_iter()
                .filter(|solution| predicate(solution))
                .collect())
        }
        Operator::Project { variables, inner } => {
            let solutions = eval(store, inner, order_by, stats)?;
            Ok(solutions
                .into_iter()
                .map(|solution| solution.project(variables))
                .collect())
        }
        Operator::Distinct { inner } | Operator::Reduced { inner } => {
            let mut solutions = eval(store, inner, order_by, stats)?;
            solutions.sort_by(|a, b| a.compare(b));
            solutions.dedup_by(|a, b| a.same_bindings(b));
            Ok(solutions)
        }
        Operator::Limit { inner, limit } => {
            let mut solutions = eval(store, inner, order_by, stats)?;
            solutions.truncate(*limit);
            Ok(solutions)
        }
        Operator::GroupAggregate {
            keys,
            aggregate,
            inner,
        } => {
            let solutions = eval(store, inner, order_by, stats)?;

            // Inputs arrive sorted on the key variables (the caller routes
            // the keys through ORDER BY), so groups are adjacent runs.
            let mut grouped = Vec::new();
            let mut start = 0;
            while start < solutions.len() {
                let mut end = start + 1;
                while end < solutions.len()
                    && keys
                        .iter()
                        .all(|key| solutions[end].get(key) == solutions[start].get(key))
                {
                    end += 1;
                }
                let key_solution = solutions[start].project(keys);
                grouped.push(aggregate.apply(&key_solution, &solutions[start..end])?);
                start = end;
            }
            Ok(grouped)
        }
    }
}
