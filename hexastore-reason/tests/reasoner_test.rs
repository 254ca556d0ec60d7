//! Reasoner machinery: rule registration, native callbacks, provenance
//! deduplication and circularity suppression.

use hexastore_model::{Order, Term, TermPattern, Triple, TriplePattern, Variable, vocab};
use hexastore_reason::{Adaptor, ForwardReasoner, parse_and_register};
use hexastore_store::{IndexOrder, MemoryHexastore, TripleReader};

const A: &str = "http://example.com/A";
const B: &str = "http://example.com/B";
const C: &str = "http://example.com/C";
const D: &str = "http://example.com/D";
const FOO: &str = "http://example.com/Foo";
const BAR: &str = "http://example.com/Bar";

const PARENT: &str = "https://schema.org/parent";
const SIBLING: &str = "https://schema.org/sibling";
const PERSON: &str = "https://schema.org/Person";
const ORGANISATION: &str = "https://schema.org/Organisation";

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(iri(s), iri(p), iri(o))
}

fn var(name: &str) -> TermPattern {
    TermPattern::Variable(Variable::new(name))
}

fn bag_count(store: &MemoryHexastore, derived: &Triple) -> usize {
    let subject = Term::reified(derived.clone());
    store
        .leaf(
            IndexOrder::Spo,
            &subject,
            &Term::iri(vocab::INFERRED_FROM),
            Order::Ascending,
        )
        .filter(|node| {
            store.contains(&Triple::new(
                node.clone(),
                Term::iri(vocab::RDF_TYPE),
                Term::iri(vocab::RDF_BAG),
            ))
        })
        .count()
}

#[test]
fn sibling_rule_with_is_not_constraint() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    parse_and_register(
        "@prefix schema: <https://schema.org/> .\n\
         ($c1 schema:parent $p), ($c2 schema:parent $p) st ($c1 is-not $c2)\n\
             → ($c1 schema:sibling $c2) .\n",
        &mut reasoner,
    )
    .unwrap();

    reasoner.insert(triple(C, PARENT, A)).unwrap();
    reasoner.insert(triple(D, PARENT, A)).unwrap();

    let store = reasoner.store();
    assert!(store.contains(&triple(C, SIBLING, D)));
    assert!(store.contains(&triple(D, SIBLING, C)));
    assert!(!store.contains(&triple(C, SIBLING, C)));
    assert!(!store.contains(&triple(D, SIBLING, D)));
}

#[test]
fn rules_apply_to_facts_already_in_the_store() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    reasoner.insert(triple(A, SIBLING, B)).unwrap();

    parse_and_register(
        "@prefix schema: <https://schema.org/> .\n\
         ($x schema:sibling $y) → ($y schema:sibling $x) .\n",
        &mut reasoner,
    )
    .unwrap();

    assert!(reasoner.store().contains(&triple(B, SIBLING, A)));
}

#[test]
fn fixed_subject_trigger_only_fires_for_that_subject() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    parse_and_register(
        "@prefix example: <http://example.com/> .\n\
         @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
         (example:A a $o) → ($o rdfs:subClassOf rdfs:Resource) .\n",
        &mut reasoner,
    )
    .unwrap();

    reasoner.insert(triple(A, vocab::RDF_TYPE, FOO)).unwrap();
    reasoner.insert(triple(B, vocab::RDF_TYPE, BAR)).unwrap();

    let resource = "http://www.w3.org/2000/01/rdf-schema#Resource";
    let subclass = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
    assert!(reasoner.store().contains(&triple(FOO, subclass, resource)));
    assert!(!reasoner.store().contains(&triple(BAR, subclass, resource)));
}

#[test]
fn fixed_object_trigger_only_fires_for_that_object() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    parse_and_register(
        "@prefix example: <http://example.com/> .\n\
         @prefix schema: <https://schema.org/> .\n\
         ($s a schema:Person) → ($s a example:Person) .\n",
        &mut reasoner,
    )
    .unwrap();

    reasoner.insert(triple(A, vocab::RDF_TYPE, PERSON)).unwrap();
    reasoner
        .insert(triple(B, vocab::RDF_TYPE, ORGANISATION))
        .unwrap();

    assert!(reasoner
        .store()
        .contains(&triple(A, vocab::RDF_TYPE, "http://example.com/Person")));
    assert!(!reasoner
        .store()
        .contains(&triple(B, vocab::RDF_TYPE, "http://example.com/Person")));
}

fn parent_sibling_rule(adaptor: &mut Adaptor<'_>, trigger: &Triple) {
    // Children of the same parent are siblings of one another.
    let others: Vec<Term> = adaptor
        .reader()
        .leaf(IndexOrder::Ops, &trigger.o, &trigger.p, Order::Ascending)
        .collect();
    for other in others {
        if other == trigger.s {
            continue;
        }
        let premise = Triple::new(other.clone(), trigger.p.clone(), trigger.o.clone());
        adaptor.insert(
            Triple::new(trigger.s.clone(), Term::iri(SIBLING), other.clone()),
            vec![trigger.clone(), premise.clone()],
        );
        adaptor.insert(
            Triple::new(other, Term::iri(SIBLING), trigger.s.clone()),
            vec![trigger.clone(), premise],
        );
    }
}

#[test]
fn native_callback_rules_fire_like_parsed_ones() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    reasoner
        .register_callback(
            TriplePattern::new(var("s"), iri(PARENT), var("o")),
            "parent-sibling",
            parent_sibling_rule,
        )
        .unwrap();

    reasoner.insert(triple(C, PARENT, A)).unwrap();
    reasoner.insert(triple(D, PARENT, A)).unwrap();

    let store = reasoner.store();
    assert!(store.contains(&triple(C, SIBLING, D)));
    assert!(store.contains(&triple(D, SIBLING, C)));
    assert!(!store.contains(&triple(C, SIBLING, C)));
}

#[test]
fn rederivation_with_identical_premises_reuses_the_bag() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    reasoner
        .register_callback(
            TriplePattern::new(var("s"), iri(PARENT), var("o")),
            "parent-sibling",
            parent_sibling_rule,
        )
        .unwrap();

    reasoner.insert(triple(C, PARENT, A)).unwrap();
    reasoner.insert(triple(D, PARENT, A)).unwrap();
    assert_eq!(bag_count(reasoner.store(), &triple(C, SIBLING, D)), 1);

    // Re-asserting the fact re-runs the rules; the derivation's premise
    // set matches the existing bag, so no second bag appears.
    reasoner.insert(triple(D, PARENT, A)).unwrap();
    assert_eq!(bag_count(reasoner.store(), &triple(C, SIBLING, D)), 1);

    // After a retraction, re-insertion builds the provenance afresh.
    reasoner.delete(&triple(D, PARENT, A)).unwrap();
    assert!(!reasoner.store().contains(&triple(C, SIBLING, D)));
    reasoner.insert(triple(D, PARENT, A)).unwrap();
    assert_eq!(bag_count(reasoner.store(), &triple(C, SIBLING, D)), 1);
}

#[test]
fn symmetric_rederivation_is_suppressed_as_circular() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    parse_and_register(
        "@prefix schema: <https://schema.org/> .\n\
         ($x schema:sibling $y) → ($y schema:sibling $x) .\n",
        &mut reasoner,
    )
    .unwrap();

    reasoner.insert(triple(A, SIBLING, B)).unwrap();

    let store = reasoner.store();
    assert!(store.contains(&triple(B, SIBLING, A)));
    // (B sibling A) justifies nothing about (A sibling B): the round trip
    // was dropped, so the original fact has no provenance at all.
    let original = Term::reified(triple(A, SIBLING, B));
    assert_eq!(
        store
            .leaf(
                IndexOrder::Spo,
                &original,
                &Term::iri(vocab::INFERRED_FROM),
                Order::Ascending,
            )
            .count(),
        0
    );
    assert_eq!(bag_count(store, &triple(B, SIBLING, A)), 0);
    // Single premise: direct inferred_from edge instead of a bag.
    assert!(store.contains(&Triple::new(
        Term::reified(triple(B, SIBLING, A)),
        Term::iri(vocab::INFERRED_FROM),
        Term::reified(triple(A, SIBLING, B)),
    )));
}

#[test]
fn registering_the_same_rule_twice_is_deduplicated() {
    let document = "@prefix schema: <https://schema.org/> .\n\
         ($x schema:sibling $y) → ($y schema:sibling $x) .\n";

    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    parse_and_register(document, &mut reasoner).unwrap();
    parse_and_register(document, &mut reasoner).unwrap();

    reasoner.insert(triple(A, SIBLING, B)).unwrap();

    // One derivation, one provenance edge; a duplicated rule would try to
    // record the derivation twice.
    let store = reasoner.store();
    assert!(store.contains(&triple(B, SIBLING, A)));
    assert_eq!(store.len(), 3);
}

#[test]
fn deleting_a_base_fact_is_clean_without_rules() {
    let mut reasoner = ForwardReasoner::new(MemoryHexastore::new());
    reasoner.insert(triple(A, SIBLING, B)).unwrap();
    reasoner.delete(&triple(A, SIBLING, B)).unwrap();
    assert_eq!(reasoner.store().len(), 0);
}
