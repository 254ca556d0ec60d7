//! BGP matching, ORDER BY-driven index selection, and visit counting.

use hexastore_model::{Order, OrderCondition, Term, TermPattern, Triple, TriplePattern, Variable};
use hexastore_query::execute;
use hexastore_store::MemoryHexastore;

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn var(name: &str) -> TermPattern {
    TermPattern::Variable(Variable::new(name))
}

const DAVE: &str = "http://example.com/dave-smith";
const ERIC: &str = "http://example.com/eric-miller";
const ERIC_MBOX: &str = "mailto:e.miller123(at)example";
const W3: &str = "http://example.com/w3";
const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const KNOWS: &str = "http://xmlns.com/foaf/0.1/knows";
const MBOX: &str = "http://xmlns.com/foaf/0.1/mbox";
const NAME: &str = "http://xmlns.com/foaf/0.1/name";
const ORGANIZATION: &str = "https://schema.org/Organization";
const PERSON: &str = "http://xmlns.com/foaf/0.1/Person";
const TITLE: &str = "http://xmlns.com/foaf/0.1/title";
const WORKS_FOR: &str = "https://schema.org/worksFor";

fn store() -> MemoryHexastore {
    let mut store = MemoryHexastore::new();
    for (s, p, o) in [
        (DAVE, TYPE, iri(PERSON)),
        (DAVE, NAME, Term::string("Dave Smith")),
        (ERIC, TYPE, iri(PERSON)),
        (ERIC, NAME, Term::string("Eric Miller")),
        (ERIC, MBOX, iri(ERIC_MBOX)),
        (ERIC, TITLE, Term::string("Dr")),
        (W3, TYPE, iri(ORGANIZATION)),
        (W3, NAME, Term::string("W3")),
        (DAVE, KNOWS, iri(ERIC)),
        (ERIC, KNOWS, iri(DAVE)),
        (ERIC, WORKS_FOR, iri(W3)),
    ] {
        store.insert(Triple::new(iri(s), iri(p), o));
    }
    store
}

fn binding(solution: &hexastore_model::Solution, name: &str) -> Term {
    solution.get(&Variable::new(name)).cloned().unwrap()
}

#[test]
fn full_scan_with_mixed_order_directions() {
    let store = store();
    let (solutions, stats) = execute(
        &store,
        &[TriplePattern::new(var("s"), var("p"), var("o"))],
        &[OrderCondition::desc("s"), OrderCondition::asc("p")],
        None,
    )
    .unwrap();

    let rows: Vec<(Term, Term)> = solutions
        .iter()
        .map(|s| (binding(s, "s"), binding(s, "p")))
        .collect();
    assert_eq!(
        rows,
        vec![
            (iri(W3), iri(TYPE)),
            (iri(W3), iri(NAME)),
            (iri(ERIC), iri(TYPE)),
            (iri(ERIC), iri(KNOWS)),
            (iri(ERIC), iri(MBOX)),
            (iri(ERIC), iri(NAME)),
            (iri(ERIC), iri(TITLE)),
            (iri(ERIC), iri(WORKS_FOR)),
            (iri(DAVE), iri(TYPE)),
            (iri(DAVE), iri(KNOWS)),
            (iri(DAVE), iri(NAME)),
        ]
    );

    // A full scan visits each triple exactly once.
    assert_eq!(stats.triples_visited, solutions.len() as u64);
}

#[test]
fn join_of_two_patterns() {
    let store = store();
    let (solutions, _) = execute(
        &store,
        &[
            TriplePattern::new(var("person"), iri(TYPE), iri(PERSON)),
            TriplePattern::new(var("person"), iri(NAME), var("name")),
        ],
        &[],
        None,
    )
    .unwrap();

    let rows: Vec<(Term, Term)> = solutions
        .iter()
        .map(|s| (binding(s, "person"), binding(s, "name")))
        .collect();
    assert_eq!(
        rows,
        vec![
            (iri(DAVE), Term::string("Dave Smith")),
            (iri(ERIC), Term::string("Eric Miller")),
        ]
    );
}

#[test]
fn join_ordered_by_joined_variable() {
    let store = store();
    let (solutions, stats) = execute(
        &store,
        &[
            TriplePattern::new(var("person"), iri(TYPE), iri(PERSON)),
            TriplePattern::new(var("person"), iri(NAME), var("name")),
        ],
        &[OrderCondition::desc("name")],
        None,
    )
    .unwrap();

    let names: Vec<Term> = solutions.iter().map(|s| binding(s, "name")).collect();
    assert_eq!(
        names,
        vec![Term::string("Eric Miller"), Term::string("Dave Smith")]
    );
    // One visit per person for each of the two patterns.
    assert_eq!(stats.triples_visited, solutions.len() as u64 * 2);
}

#[test]
fn ground_pattern_yields_at_most_one_solution() {
    let store = store();
    let (solutions, stats) = execute(
        &store,
        &[TriplePattern::new(iri(DAVE), iri(TYPE), iri(PERSON))],
        &[],
        None,
    )
    .unwrap();
    assert_eq!(solutions.len(), 1);
    assert!(solutions[0].bindings().is_empty());
    assert_eq!(stats.triples_visited, 1);

    let (solutions, stats) = execute(
        &store,
        &[TriplePattern::new(iri(DAVE), iri(TYPE), iri(ORGANIZATION))],
        &[],
        None,
    )
    .unwrap();
    assert!(solutions.is_empty());
    assert_eq!(stats.triples_visited, 0);
}

#[test]
fn absent_index_key_short_circuits() {
    let store = store();
    let (solutions, stats) = execute(
        &store,
        &[TriplePattern::new(
            var("s"),
            iri("http://xmlns.com/foaf/0.1/nothing"),
            var("o"),
        )],
        &[],
        None,
    )
    .unwrap();
    assert!(solutions.is_empty());
    assert_eq!(stats.triples_visited, 0);
}

#[test]
fn solutions_carry_their_source_triples() {
    let store = store();
    let (solutions, _) = execute(
        &store,
        &[
            TriplePattern::new(var("person"), iri(TYPE), iri(PERSON)),
            TriplePattern::new(var("person"), iri(NAME), var("name")),
        ],
        &[],
        None,
    )
    .unwrap();

    let dave = &solutions[0];
    assert!(dave.triples().contains(&Triple::new(
        iri(DAVE),
        iri(TYPE),
        iri(PERSON)
    )));
    assert!(dave.triples().contains(&Triple::new(
        iri(DAVE),
        iri(NAME),
        Term::string("Dave Smith")
    )));
    assert_eq!(dave.triples().len(), 2);
}

#[test]
fn caller_bindings_constrain_the_match() {
    let store = store();
    let order = std::rc::Rc::new(vec![]);
    let initial = hexastore_model::Solution::new(
        [(Variable::new("person"), iri(ERIC))].into_iter().collect(),
        order,
        Default::default(),
    );

    let (solutions, _) = execute(
        &store,
        &[TriplePattern::new(var("person"), iri(NAME), var("name"))],
        &[],
        Some(&initial),
    )
    .unwrap();

    assert_eq!(solutions.len(), 1);
    assert_eq!(binding(&solutions[0], "name"), Term::string("Eric Miller"));
    assert_eq!(binding(&solutions[0], "person"), iri(ERIC));
}

#[test]
fn repeated_variable_requires_agreement() {
    let mut store = store();
    store.insert(Triple::new(iri(DAVE), iri(KNOWS), iri(DAVE)));

    let (solutions, _) = execute(
        &store,
        &[TriplePattern::new(var("x"), iri(KNOWS), var("x"))],
        &[],
        None,
    )
    .unwrap();

    assert_eq!(solutions.len(), 1);
    assert_eq!(binding(&solutions[0], "x"), iri(DAVE));
}

#[test]
fn resorting_by_the_stated_order_is_a_noop() {
    let store = store();
    let order_by = [OrderCondition::desc("s"), OrderCondition::asc("p")];
    let (solutions, _) = execute(
        &store,
        &[TriplePattern::new(var("s"), var("p"), var("o"))],
        &order_by,
        None,
    )
    .unwrap();

    let mut resorted = solutions.clone();
    resorted.sort_by(|a, b| a.compare(b));
    assert_eq!(solutions, resorted);
}
