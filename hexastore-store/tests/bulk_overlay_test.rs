//! Merged visibility and commit/discard behaviour of the bulk-insert
//! overlay.

use hexastore_model::{Order, Term, Triple};
use hexastore_store::{BulkInserter, IndexOrder, MemoryHexastore, TripleReader};

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn triple(s: &str, p: &str, o: &str) -> Triple {
    Triple::new(iri(s), iri(p), iri(o))
}

fn seeded() -> MemoryHexastore {
    let mut store = MemoryHexastore::new();
    store.insert(triple("http://e/A", "http://e/knows", "http://e/B"));
    store.insert(triple("http://e/A", "http://e/name", "http://e/n1"));
    store
}

#[test]
fn reads_merge_underlying_and_overlay_in_key_order() {
    let mut store = seeded();
    let mut inserter = BulkInserter::new(&mut store);
    inserter.insert(triple("http://e/A", "http://e/knows", "http://e/C"));
    inserter.insert(triple("http://e/B", "http://e/knows", "http://e/A"));

    let all: Vec<Triple> = inserter.triples().collect();
    assert_eq!(
        all,
        vec![
            triple("http://e/A", "http://e/knows", "http://e/B"),
            triple("http://e/A", "http://e/knows", "http://e/C"),
            triple("http://e/A", "http://e/name", "http://e/n1"),
            triple("http://e/B", "http://e/knows", "http://e/A"),
        ]
    );

    // A leaf spanning both sides merges without duplicates.
    let objects: Vec<Term> = inserter
        .leaf(
            IndexOrder::Spo,
            &iri("http://e/A"),
            &iri("http://e/knows"),
            Order::Ascending,
        )
        .collect();
    assert_eq!(objects, vec![iri("http://e/B"), iri("http://e/C")]);
}

#[test]
fn duplicate_keys_appear_once() {
    let mut store = seeded();
    let mut inserter = BulkInserter::new(&mut store);
    inserter.insert(triple("http://e/A", "http://e/knows", "http://e/C"));

    let trunks: Vec<Term> = inserter.trunks(IndexOrder::Spo, Order::Ascending).collect();
    assert_eq!(trunks, vec![iri("http://e/A")]);

    let branches: Vec<Term> = inserter
        .branches(IndexOrder::Spo, &iri("http://e/A"), Order::Ascending)
        .collect();
    assert_eq!(
        branches,
        vec![iri("http://e/knows"), iri("http://e/name")]
    );
}

#[test]
fn insert_sees_through_to_the_underlying_store() {
    let mut store = seeded();
    let mut inserter = BulkInserter::new(&mut store);

    // Already in the underlying store: not staged, not new.
    assert!(!inserter.insert(triple("http://e/A", "http://e/knows", "http://e/B")));
    assert!(inserter.insert(triple("http://e/C", "http://e/knows", "http://e/A")));
    assert!(!inserter.insert(triple("http://e/C", "http://e/knows", "http://e/A")));
    assert_eq!(inserter.overlay().len(), 1);
    assert!(inserter.contains(&triple("http://e/A", "http://e/knows", "http://e/B")));
    assert!(inserter.contains(&triple("http://e/C", "http://e/knows", "http://e/A")));
}

#[test]
fn commit_flushes_the_overlay() {
    let mut store = seeded();
    let mut inserter = BulkInserter::new(&mut store);
    inserter.insert(triple("http://e/C", "http://e/knows", "http://e/A"));
    inserter.bulk_insert(vec![
        triple("http://e/C", "http://e/knows", "http://e/B"),
        triple("http://e/C", "http://e/knows", "http://e/A"),
    ]);
    let gained = inserter.commit().unwrap();

    assert_eq!(gained, 2);
    assert_eq!(store.len(), 4);
    assert!(store.contains(&triple("http://e/C", "http://e/knows", "http://e/A")));
    assert!(store.contains(&triple("http://e/C", "http://e/knows", "http://e/B")));
}

#[test]
fn dropping_without_commit_discards_the_overlay() {
    let mut store = seeded();
    {
        let mut inserter = BulkInserter::new(&mut store);
        inserter.insert(triple("http://e/C", "http://e/knows", "http://e/A"));
    }
    assert_eq!(store.len(), 2);
    assert!(!store.contains(&triple("http://e/C", "http://e/knows", "http://e/A")));
}

#[test]
fn descending_merge_agrees_with_ascending() {
    let mut store = seeded();
    let mut inserter = BulkInserter::new(&mut store);
    inserter.insert(triple("http://e/B", "http://e/knows", "http://e/A"));
    inserter.insert(triple("http://e/A", "http://e/knows", "http://e/C"));

    let ascending: Vec<Term> = inserter.trunks(IndexOrder::Spo, Order::Ascending).collect();
    let mut descending: Vec<Term> = inserter
        .trunks(IndexOrder::Spo, Order::Descending)
        .collect();
    descending.reverse();
    assert_eq!(ascending, descending);
}
