//! Tombstone and interval semantics of the versioned hexastore.

use hexastore_model::{Order, Term, Triple};
use hexastore_store::{IndexOrder, TripleReader, TripleStatusItem, VersionedHexastore};

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(iri(s), iri(p), iri(o))
}

#[test]
fn insert_opens_an_interval() {
    let mut store = VersionedHexastore::new();
    let t = triple("http://e/A", "http://e/p", "http://e/B");

    assert!(store.insert_at(t.clone(), 3));
    assert!(store.contains(&t));
    assert_eq!(store.len(), 1);

    let status = store.status(&t).unwrap();
    assert_eq!(
        status.statuses,
        vec![TripleStatusItem {
            valid_from: Some(3),
            valid_to: None,
        }]
    );
}

#[test]
fn reinsert_while_live_is_ignored() {
    let mut store = VersionedHexastore::new();
    let t = triple("http://e/A", "http://e/p", "http://e/B");

    assert!(store.insert_at(t.clone(), 0));
    assert!(!store.insert_at(t.clone(), 1));
    assert_eq!(store.status(&t).unwrap().statuses.len(), 1);
    assert_eq!(store.len(), 1);
}

#[test]
fn delete_closes_the_interval_and_reinsert_opens_a_new_one() {
    let mut store = VersionedHexastore::new();
    let t = triple("http://e/A", "http://e/p", "http://e/B");

    store.insert_at(t.clone(), 0);
    assert!(store.delete_at(&t, 5));
    assert!(!store.contains(&t));
    assert_eq!(store.len(), 0);

    assert!(store.insert_at(t.clone(), 7));
    assert!(store.contains(&t));

    let status = store.status(&t).unwrap();
    assert_eq!(
        status.statuses,
        vec![
            TripleStatusItem {
                valid_from: Some(0),
                valid_to: Some(5),
            },
            TripleStatusItem {
                valid_from: Some(7),
                valid_to: None,
            },
        ]
    );
}

#[test]
fn delete_of_never_inserted_triple_records_a_tombstone() {
    let mut store = VersionedHexastore::new();
    let t = triple("http://e/A", "http://e/p", "http://e/B");

    assert!(!store.delete_at(&t, 2));
    assert!(!store.contains(&t));
    assert_eq!(store.len(), 0);

    let status = store.status(&t).unwrap();
    assert_eq!(
        status.statuses,
        vec![TripleStatusItem {
            valid_from: None,
            valid_to: Some(2),
        }]
    );
}

#[test]
fn traversal_skips_dead_triples() {
    let mut store = VersionedHexastore::new();
    let a = triple("http://e/A", "http://e/p", "http://e/B");
    let b = triple("http://e/A", "http://e/p", "http://e/C");
    store.insert_at(a.clone(), 0);
    store.insert_at(b.clone(), 1);
    store.delete_at(&a, 2);

    let live: Vec<Triple> = store.triples().collect();
    assert_eq!(live, vec![b.clone()]);

    let leaf: Vec<Term> = store
        .leaf(
            IndexOrder::Spo,
            &iri("http://e/A"),
            &iri("http://e/p"),
            Order::Ascending,
        )
        .collect();
    assert_eq!(leaf, vec![iri("http://e/C")]);

    // The paired reverse ordering agrees.
    let leaf: Vec<Term> = store
        .leaf(
            IndexOrder::Pso,
            &iri("http://e/p"),
            &iri("http://e/A"),
            Order::Ascending,
        )
        .collect();
    assert_eq!(leaf, vec![iri("http://e/C")]);
}

#[test]
fn bulk_insert_reports_new_triples_only() {
    let mut store = VersionedHexastore::new();
    let a = triple("http://e/A", "http://e/p", "http://e/B");
    let b = triple("http://e/A", "http://e/p", "http://e/C");
    let c = triple("http://e/B", "http://e/q", "http://e/C");

    store.insert_at(a.clone(), 0);
    let inserted = store.bulk_insert_at(vec![a.clone(), b.clone(), c.clone()], 1);
    assert_eq!(inserted, 2);
    assert_eq!(store.len(), 3);

    // The pre-existing triple keeps its original interval.
    assert_eq!(
        store.status(&a).unwrap().statuses,
        vec![TripleStatusItem {
            valid_from: Some(0),
            valid_to: None,
        }]
    );

    let total: usize = store
        .trunks(IndexOrder::Pos, Order::Ascending)
        .map(|trunk| store.trunk_len(IndexOrder::Pos, &trunk))
        .sum();
    assert_eq!(total, 3);
}
