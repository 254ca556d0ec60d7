use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::rc::Rc;

use hexastore_model::{
    OrderCondition, Solution, Term, TermPattern, Triple, TriplePattern, Variable,
};

use crate::reasoner::Adaptor;

/// A solution predicate attached to a rule body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// Fails when any two of the listed variables bind to equal terms.
    IsNot(Vec<Variable>),
}

impl Constraint {
    pub fn satisfied(&self, solution: &Solution) -> bool {
        match self {
            Constraint::IsNot(variables) => {
                for (i, left) in variables.iter().enumerate() {
                    for right in &variables[i + 1..] {
                        if solution.get(left) == solution.get(right) {
                            return false;
                        }
                    }
                }
                true
            }
        }
    }
}

/// A rule as parsed from the DSL: body patterns, constraints, and a head
/// that is either triple patterns to assert or further rules to register.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedRule {
    pub body: Vec<TriplePattern>,
    pub constraints: Vec<Constraint>,
    pub head: RuleHead,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleHead {
    Patterns(Vec<TriplePattern>),
    Rules(Vec<ParsedRule>),
}

impl ParsedRule {
    /// Substitutes bound variables throughout the rule. Used when a
    /// recursive rule fires and its head rules are specialised to the
    /// trigger's bindings.
    pub fn resolve(&self, solution: &Solution) -> ParsedRule {
        ParsedRule {
            body: self.body.iter().map(|p| p.resolve(solution)).collect(),
            constraints: self.constraints.clone(),
            head: match &self.head {
                RuleHead::Patterns(patterns) => {
                    RuleHead::Patterns(patterns.iter().map(|p| p.resolve(solution)).collect())
                }
                RuleHead::Rules(rules) => {
                    RuleHead::Rules(rules.iter().map(|r| r.resolve(solution)).collect())
                }
            },
        }
    }
}

/// One registered rule instance, keyed in the registry by its trigger
/// pattern. Equality and hashing cover the captured state, so registering
/// the same rule twice deduplicates and retraction can remove the exact
/// instance again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleAction {
    Simple(SimpleRule),
    Register(RegisterRule),
    Native(NativeRule),
}

/// Body-and-head rule specialised to one trigger pattern: when a triple
/// matches `trigger`, the remaining body is evaluated under the trigger's
/// bindings and each solution asserts the head patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleRule {
    pub trigger: TriplePattern,
    pub rest: Vec<TriplePattern>,
    pub constraints: Vec<Constraint>,
    pub head: Vec<TriplePattern>,
    /// Premises threaded in when this rule was itself registered by a
    /// recursive rule; they join every derivation's provenance.
    pub premises: Vec<Triple>,
}

/// A recursive rule: firing registers its head rules (specialised to the
/// trigger's bindings) instead of asserting triples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisterRule {
    pub trigger: TriplePattern,
    pub rest: Vec<TriplePattern>,
    pub constraints: Vec<Constraint>,
    pub rules: Vec<ParsedRule>,
}

/// An externally supplied callback rule. Compared and hashed by name and
/// function identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeRule {
    pub name: &'static str,
    pub apply: fn(&mut Adaptor<'_>, &Triple),
}

/// Which positions of a pattern are fixed (bit 0 = subject, bit 1 =
/// predicate, bit 2 = object), plus the fixed terms in s, p, o order.
/// These are the registry bucket index and bucket key.
pub(crate) fn fixedness(pattern: &TriplePattern) -> (usize, Vec<Term>) {
    let mut bucket = 0;
    let mut key = Vec::new();
    for (bit, slot) in [(1, &pattern.s), (2, &pattern.p), (4, &pattern.o)] {
        if let TermPattern::Term(term) = slot {
            bucket += bit;
            key.push(term.clone());
        }
    }
    (bucket, key)
}

/// Binds a trigger pattern against a concrete triple. `None` when a
/// constant slot disagrees or a repeated variable would bind two different
/// terms. The triple itself becomes the solution's provenance.
pub(crate) fn bind_trigger(
    pattern: &TriplePattern,
    triple: &Triple,
    order_by: &Rc<Vec<OrderCondition>>,
) -> Option<Solution> {
    let mut bindings: BTreeMap<Variable, Term> = BTreeMap::new();
    for (slot, term) in pattern
        .slots()
        .into_iter()
        .zip([&triple.s, &triple.p, &triple.o])
    {
        match slot {
            TermPattern::Term(expected) => {
                if expected != term {
                    return None;
                }
            }
            TermPattern::Variable(variable) => match bindings.get(variable) {
                Some(existing) if existing != term => return None,
                Some(_) => {}
                None => {
                    bindings.insert(variable.clone(), term.clone());
                }
            },
        }
    }
    Some(Solution::new(
        bindings,
        Rc::clone(order_by),
        BTreeSet::from([triple.clone()]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(v: &str) -> Term {
        Term::iri(v)
    }

    fn var(name: &str) -> TermPattern {
        TermPattern::Variable(Variable::new(name))
    }

    #[test]
    fn fixedness_buckets_cover_the_power_set() {
        let s = iri("http://e/s");
        let p = iri("http://e/p");
        let o = iri("http://e/o");

        let cases = [
            (TriplePattern::new(var("a"), var("b"), var("c")), 0, 0),
            (TriplePattern::new(s.clone(), var("b"), var("c")), 1, 1),
            (TriplePattern::new(var("a"), p.clone(), var("c")), 2, 1),
            (TriplePattern::new(s.clone(), p.clone(), var("c")), 3, 2),
            (TriplePattern::new(var("a"), var("b"), o.clone()), 4, 1),
            (TriplePattern::new(s.clone(), var("b"), o.clone()), 5, 2),
            (TriplePattern::new(var("a"), p.clone(), o.clone()), 6, 2),
            (TriplePattern::new(s.clone(), p.clone(), o.clone()), 7, 3),
        ];
        for (pattern, bucket, key_len) in cases {
            let (b, key) = fixedness(&pattern);
            assert_eq!(b, bucket);
            assert_eq!(key.len(), key_len);
        }
    }

    #[test]
    fn bind_trigger_unifies_repeated_variables() {
        let order = Rc::new(vec![]);
        let pattern = TriplePattern::new(var("x"), iri("http://e/p"), var("x"));

        let reflexive = Triple::new(iri("http://e/A"), iri("http://e/p"), iri("http://e/A"));
        let solution = bind_trigger(&pattern, &reflexive, &order).unwrap();
        assert_eq!(solution.get(&Variable::new("x")), Some(&iri("http://e/A")));

        let skewed = Triple::new(iri("http://e/A"), iri("http://e/p"), iri("http://e/B"));
        assert!(bind_trigger(&pattern, &skewed, &order).is_none());
    }

    #[test]
    fn is_not_fails_on_equal_bindings() {
        let order = Rc::new(vec![]);
        let constraint = Constraint::IsNot(vec![Variable::new("a"), Variable::new("b")]);

        let same = Solution::new(
            [
                (Variable::new("a"), iri("http://e/X")),
                (Variable::new("b"), iri("http://e/X")),
            ]
            .into_iter()
            .collect(),
            Rc::clone(&order),
            BTreeSet::new(),
        );
        assert!(!constraint.satisfied(&same));

        let different = Solution::new(
            [
                (Variable::new("a"), iri("http://e/X")),
                (Variable::new("b"), iri("http://e/Y")),
            ]
            .into_iter()
            .collect(),
            order,
            BTreeSet::new(),
        );
        assert!(constraint.satisfied(&different));
    }
}
