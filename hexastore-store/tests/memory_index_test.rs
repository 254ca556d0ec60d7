//! Six-ordering agreement, idempotence and delete inversion for the plain
//! in-memory hexastore.

use hexastore_model::{Order, Term, Triple};
use hexastore_store::{IndexOrder, MemoryHexastore, TripleReader};

fn iri(v: &str) -> Term {
    Term::iri(v)
}

fn dave_eric_store() -> (MemoryHexastore, Vec<Triple>) {
    let dave = iri("http://example.com/dave-smith");
    let eric = iri("http://example.com/eric-miller");
    let w3 = iri("http://example.com/w3");
    let rdf_type = iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
    let knows = iri("http://xmlns.com/foaf/0.1/knows");
    let mbox = iri("http://xmlns.com/foaf/0.1/mbox");
    let name = iri("http://xmlns.com/foaf/0.1/name");
    let person = iri("http://xmlns.com/foaf/0.1/Person");
    let organization = iri("https://schema.org/Organization");
    let title = iri("http://xmlns.com/foaf/0.1/title");
    let works_for = iri("https://schema.org/worksFor");

    let triples = vec![
        Triple::new(dave.clone(), rdf_type.clone(), person.clone()),
        Triple::new(dave.clone(), name.clone(), Term::string("Dave Smith")),
        Triple::new(eric.clone(), rdf_type.clone(), person.clone()),
        Triple::new(eric.clone(), name.clone(), Term::string("Eric Miller")),
        Triple::new(eric.clone(), mbox.clone(), iri("mailto:e.miller123(at)example")),
        Triple::new(eric.clone(), title.clone(), Term::string("Dr")),
        Triple::new(w3.clone(), rdf_type.clone(), organization.clone()),
        Triple::new(w3.clone(), name.clone(), Term::string("W3")),
        Triple::new(dave.clone(), knows.clone(), eric.clone()),
        Triple::new(eric.clone(), knows.clone(), dave.clone()),
        Triple::new(eric.clone(), works_for.clone(), w3.clone()),
    ];

    let mut store = MemoryHexastore::new();
    for triple in &triples {
        assert!(store.insert(triple.clone()));
    }
    (store, triples)
}

#[test]
fn every_triple_is_visible_under_all_six_orderings() {
    let (store, triples) = dave_eric_store();

    for index in IndexOrder::ALL {
        let mut seen: Vec<Triple> = store
            .triples_in(index, [Order::Ascending; 3])
            .collect();
        seen.sort();
        let mut expected = triples.clone();
        expected.sort();
        assert_eq!(seen, expected, "ordering {index:?} disagrees");
    }
}

#[test]
fn trunk_counts_sum_to_triple_count() {
    let (store, triples) = dave_eric_store();
    assert_eq!(store.len(), triples.len());

    for index in IndexOrder::ALL {
        let total: usize = store
            .trunks(index, Order::Ascending)
            .map(|trunk| store.trunk_len(index, &trunk))
            .sum();
        assert_eq!(total, triples.len(), "fanout counts for {index:?}");
    }
}

#[test]
fn insert_is_idempotent() {
    let (mut store, triples) = dave_eric_store();
    let before = store.len();
    assert!(!store.insert(triples[0].clone()));
    assert_eq!(store.len(), before);
}

#[test]
fn delete_inverts_insert_across_all_orderings() {
    let (mut store, triples) = dave_eric_store();
    let victim = &triples[8]; // dave knows eric

    assert!(store.delete(victim));
    assert!(!store.contains(victim));
    assert_eq!(store.len(), triples.len() - 1);

    for index in IndexOrder::ALL {
        assert!(
            !store
                .triples_in(index, [Order::Ascending; 3])
                .any(|t| t == *victim),
            "{index:?} still lists the deleted triple"
        );
    }

    // Deleting again is a no-op.
    assert!(!store.delete(victim));
    assert_eq!(store.len(), triples.len() - 1);
}

#[test]
fn leaf_sets_are_shared_between_paired_orderings() {
    let (store, _) = dave_eric_store();
    let eric = iri("http://example.com/eric-miller");
    let knows = iri("http://xmlns.com/foaf/0.1/knows");

    // spo[s][p] as a set of objects equals pso[p][s].
    let via_spo: Vec<Term> = store
        .leaf(IndexOrder::Spo, &eric, &knows, Order::Ascending)
        .collect();
    let via_pso: Vec<Term> = store
        .leaf(IndexOrder::Pso, &knows, &eric, Order::Ascending)
        .collect();
    assert_eq!(via_spo, via_pso);

    // sop[s][o] as a set of predicates equals osp[o][s].
    let dave = iri("http://example.com/dave-smith");
    let via_sop: Vec<Term> = store
        .leaf(IndexOrder::Sop, &eric, &dave, Order::Ascending)
        .collect();
    let via_osp: Vec<Term> = store
        .leaf(IndexOrder::Osp, &dave, &eric, Order::Ascending)
        .collect();
    assert_eq!(via_sop, via_osp);
    assert_eq!(via_sop, vec![knows]);
}

#[test]
fn bulk_insert_matches_single_inserts() {
    let (single, triples) = dave_eric_store();

    let mut bulk = MemoryHexastore::new();
    let mut shuffled = triples.clone();
    shuffled.reverse();
    // One duplicate in the batch; it must not be double counted.
    shuffled.push(triples[0].clone());
    assert_eq!(bulk.bulk_insert(shuffled), triples.len());

    let lhs: Vec<Triple> = single.triples().collect();
    let rhs: Vec<Triple> = bulk.triples().collect();
    assert_eq!(lhs, rhs);
    assert_eq!(bulk.len(), single.len());

    for index in IndexOrder::ALL {
        for trunk in single.trunks(index, Order::Ascending) {
            assert_eq!(
                single.trunk_len(index, &trunk),
                bulk.trunk_len(index, &trunk)
            );
        }
    }
}

#[test]
fn trunks_and_branches_iterate_in_total_order() {
    let (store, _) = dave_eric_store();

    for index in IndexOrder::ALL {
        let trunks: Vec<Term> = store.trunks(index, Order::Ascending).collect();
        let mut sorted = trunks.clone();
        sorted.sort();
        assert_eq!(trunks, sorted);

        for trunk in &trunks {
            let branches: Vec<Term> = store.branches(index, trunk, Order::Ascending).collect();
            let mut sorted = branches.clone();
            sorted.sort();
            assert_eq!(branches, sorted);
        }
    }
}

#[test]
fn triples_reconstruct_natural_order_from_any_index() {
    let (store, _) = dave_eric_store();
    let natural: Vec<Triple> = store.triples().collect();

    for index in IndexOrder::ALL {
        let mut via_index: Vec<Triple> = store
            .triples_in(index, [Order::Ascending; 3])
            .collect();
        via_index.sort();
        assert_eq!(via_index, natural, "natural reconstruction via {index:?}");
    }
}

#[test]
fn descending_traversal_reverses_trunk_order() {
    let (store, _) = dave_eric_store();
    let ascending: Vec<Term> = store.trunks(IndexOrder::Spo, Order::Ascending).collect();
    let mut descending: Vec<Term> = store.trunks(IndexOrder::Spo, Order::Descending).collect();
    descending.reverse();
    assert_eq!(ascending, descending);
}

#[test]
fn terms_lists_every_distinct_term_in_order() {
    let (store, triples) = dave_eric_store();
    let terms = store.terms();

    let mut sorted = terms.clone();
    sorted.sort();
    assert_eq!(terms, sorted);

    for triple in &triples {
        for term in [&triple.s, &triple.p, &triple.o] {
            assert!(terms.contains(term), "missing {term}");
        }
    }
}

#[test]
fn position_is_value_level_lookup() {
    let (store, _) = dave_eric_store();
    let all: Vec<Triple> = store.triples().collect();
    assert_eq!(store.position(&all[3]), Some(3));

    let absent = Triple::new(
        iri("http://example.com/nobody"),
        iri("http://xmlns.com/foaf/0.1/name"),
        Term::string("Nobody"),
    );
    assert_eq!(store.position(&absent), None);
}
