//! # Hexastore Tour
//!
//! Walks the core workflow end to end:
//! 1. Building an in-memory store.
//! 2. Reasoning with the default RDFS/OWL rule pack.
//! 3. Querying with basic graph patterns and ORDER BY.
//! 4. Grouped aggregation.

use hexastore::query::{Aggregate, Operator, evaluate};
use hexastore::{
    MemoryHexastore, OrderCondition, Result, Term, TermPattern, Triple, TriplePattern,
    TripleReader, Variable, default_reasoner, vocab,
};

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn var(name: &str) -> TermPattern {
    TermPattern::Variable(Variable::new(name))
}

fn main() -> Result<()> {
    // 1. A reasoner over a fresh in-memory hexastore, preloaded with the
    //    stock rule pack.
    let mut reasoner = default_reasoner(MemoryHexastore::new())?;

    let spouse = "https://schema.org/spouse";
    let parent = "https://schema.org/parent";
    let children = "https://schema.org/children";
    let person = "https://schema.org/Person";

    // 2. Declare vocabulary semantics as plain facts, then load data.
    //    Saturation happens on the way in.
    reasoner.insert(Triple::new(
        iri(spouse),
        iri(vocab::RDF_TYPE),
        iri(vocab::OWL_SYMMETRIC_PROPERTY),
    ))?;
    reasoner.insert(Triple::new(
        iri(children),
        iri(vocab::OWL_INVERSE_OF),
        iri(parent),
    ))?;
    reasoner.insert(Triple::new(iri(spouse), iri(vocab::RDFS_DOMAIN), iri(person)))?;

    reasoner.bulk_insert(vec![
        Triple::new(iri("http://example.com/alice"), iri(spouse), iri("http://example.com/bob")),
        Triple::new(iri("http://example.com/carol"), iri(parent), iri("http://example.com/alice")),
        Triple::new(iri("http://example.com/carol"), iri(parent), iri("http://example.com/bob")),
    ])?;

    let store = reasoner.into_store();
    println!("{} triples after saturation", store.len());
    assert!(store.contains(&Triple::new(
        iri("http://example.com/bob"),
        iri(spouse),
        iri("http://example.com/alice"),
    )));
    assert!(store.contains(&Triple::new(
        iri("http://example.com/alice"),
        iri(children),
        iri("http://example.com/carol"),
    )));

    // 3. Who are Carol's parents, busiest spouse first?
    let (solutions, stats) = hexastore::query::execute(
        &store,
        &[TriplePattern::new(
            iri("http://example.com/carol"),
            iri(parent),
            var("who"),
        )],
        &[OrderCondition::desc("who")],
        None,
    )?;
    for solution in &solutions {
        println!("carol's parent: {:?}", solution.get(&Variable::new("who")));
    }
    println!("visited {} index entries", stats.triples_visited);

    // 4. Count individuals per inferred type.
    let (groups, _) = evaluate(
        &store,
        &Operator::GroupAggregate {
            keys: vec![Variable::new("type")],
            aggregate: Aggregate::count("count"),
            inner: Box::new(Operator::bgp(vec![TriplePattern::new(
                var("x"),
                iri(vocab::RDF_TYPE),
                var("type"),
            )])),
        },
        &[OrderCondition::asc("type")],
    )?;
    for group in &groups {
        println!(
            "{:?} -> {:?}",
            group.get(&Variable::new("type")),
            group.get(&Variable::new("count")),
        );
    }

    Ok(())
}
