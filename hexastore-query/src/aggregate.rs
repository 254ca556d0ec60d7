use std::rc::Rc;

use hexastore_model::{Solution, Term, Variable};

use crate::error::Result;

/// Folds one group of subsolutions into bindings on the group key.
pub enum Aggregate {
    /// Binds the number of subsolutions.
    Count { output: Variable },
    /// Binds the first subsolution's value for `input`.
    Sample { input: Variable, output: Variable },
    /// Folds the projected `input` values with an arbitrary function;
    /// a `None` result leaves `output` unbound.
    Generic {
        input: Variable,
        output: Variable,
        fold: Rc<dyn Fn(Vec<Option<Term>>) -> Option<Term>>,
    },
    /// Applies several aggregates to the same group, accumulating their
    /// output bindings on the key.
    Multi(Vec<Aggregate>),
}

impl Aggregate {
    pub fn count(output: impl Into<String>) -> Self {
        Aggregate::Count {
            output: Variable::new(output),
        }
    }

    pub fn sample(input: impl Into<String>, output: impl Into<String>) -> Self {
        Aggregate::Sample {
            input: Variable::new(input),
            output: Variable::new(output),
        }
    }

    pub fn apply(&self, key: &Solution, group: &[Solution]) -> Result<Solution> {
        match self {
            Aggregate::Count { output } => Ok(key.extend([(
                output.clone(),
                Term::Integer(group.len() as i64),
            )])?),
            Aggregate::Sample { input, output } => {
                match group.first().and_then(|solution| solution.get(input)) {
                    Some(term) => Ok(key.extend([(output.clone(), term.clone())])?),
                    None => Ok(key.clone()),
                }
            }
            Aggregate::Generic {
                input,
                output,
                fold,
            } => {
                let values = group
                    .iter()
                    .map(|solution| solution.get(input).cloned())
                    .collect();
                match fold(values) {
                    Some(term) => Ok(key.extend([(output.clone(), term)])?),
                    None => Ok(key.clone()),
                }
            }
            Aggregate::Multi(aggregates) => {
                let mut accumulated = key.clone();
                for aggregate in aggregates {
                    accumulated = aggregate.apply(&accumulated, group)?;
                }
                Ok(accumulated)
            }
        }
    }
}
