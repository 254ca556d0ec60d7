use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use hexastore_model::{
    BlankNodeFactory, Order, OrderCondition, Term, Triple, TriplePattern, vocab,
};
use hexastore_query::execute;
use hexastore_store::{BulkInserter, IndexOrder, TripleReader, TripleWriter};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rule::{
    NativeRule, ParsedRule, RegisterRule, RuleAction, RuleHead, SimpleRule, bind_trigger,
    fixedness,
};

/// The store view handed to firing rules. Rules never write to the store
/// directly: asserted triples go onto the next-delta list, and rule
/// registrations are queued for the reasoner to process after the pass.
pub struct Adaptor<'a> {
    reader: &'a dyn TripleReader,
    pub(crate) next_delta: Vec<(Triple, Vec<Triple>)>,
    pub(crate) pending_rules: Vec<(TriplePattern, RuleAction, Vec<Triple>)>,
}

impl<'a> Adaptor<'a> {
    pub(crate) fn new(reader: &'a dyn TripleReader) -> Self {
        Adaptor {
            reader,
            next_delta: Vec::new(),
            pending_rules: Vec::new(),
        }
    }

    /// The merged read view (underlying store plus the current batch).
    pub fn reader(&self) -> &dyn TripleReader {
        self.reader
    }

    /// Asserts a derived triple justified by `premises`.
    pub fn insert(&mut self, triple: Triple, premises: Vec<Triple>) {
        self.next_delta.push((triple, premises));
    }

    /// Registers a rule as a consequence of `premises`.
    pub fn register_rule(
        &mut self,
        pattern: TriplePattern,
        action: RuleAction,
        premises: Vec<Triple>,
    ) {
        self.pending_rules.push((pattern, action, premises));
    }
}

/// Eight buckets keyed by which pattern positions are fixed; a lookup for
/// an incoming triple unions the matches of all eight.
#[derive(Debug, Default)]
struct RuleRegistry {
    buckets: [HashMap<Vec<Term>, HashSet<RuleAction>>; 8],
}

impl RuleRegistry {
    fn add(&mut self, pattern: &TriplePattern, action: RuleAction) {
        let (bucket, key) = fixedness(pattern);
        self.buckets[bucket].entry(key).or_default().insert(action);
    }

    fn remove(&mut self, pattern: &TriplePattern, action: &RuleAction) {
        let (bucket, key) = fixedness(pattern);
        if let Some(actions) = self.buckets[bucket].get_mut(&key) {
            actions.remove(action);
            if actions.is_empty() {
                self.buckets[bucket].remove(&key);
            }
        }
    }

    fn matching(&self, triple: &Triple) -> Vec<RuleAction> {
        let Triple { s, p, o } = triple;
        let keys: [Vec<Term>; 8] = [
            vec![],
            vec![s.clone()],
            vec![p.clone()],
            vec![s.clone(), p.clone()],
            vec![o.clone()],
            vec![s.clone(), o.clone()],
            vec![p.clone(), o.clone()],
            vec![s.clone(), p.clone(), o.clone()],
        ];
        let mut actions = Vec::new();
        for (bucket, key) in self.buckets.iter().zip(keys) {
            if let Some(matched) = bucket.get(&key) {
                actions.extend(matched.iter().cloned());
            }
        }
        actions
    }
}

struct Vocab {
    rdf_type: Term,
    bag: Term,
    member: Term,
    inferred_from: Term,
}

impl Default for Vocab {
    fn default() -> Self {
        Vocab {
            rdf_type: Term::iri(vocab::RDF_TYPE),
            bag: Term::iri(vocab::RDF_BAG),
            member: Term::iri(vocab::RDF_MEMBER),
            inferred_from: Term::iri(vocab::INFERRED_FROM),
        }
    }
}

/// Everything the reasoner owns besides the store, split out so the store
/// can be mutably borrowed by a bulk inserter while rules are registered.
struct Core {
    registry: RuleRegistry,
    deletion: HashMap<Triple, Vec<(TriplePattern, RuleAction)>>,
    blank_nodes: BlankNodeFactory,
    vocab: Vocab,
    no_order: Rc<Vec<OrderCondition>>,
}

/// A forward-chaining reasoner wrapping a triple store.
///
/// Every insert saturates to fixpoint before returning; a bulk insert
/// treats the whole batch as one delta so rules see all new facts at once.
/// Derivations record provenance (a direct `inferred_from` edge for a
/// single premise, an `rdf:Bag` of members otherwise), and `delete`
/// cascades through that provenance, removing derived triples that lose
/// their last support along with any rules registered as a consequence of
/// the deleted fact.
pub struct ForwardReasoner<S: TripleWriter> {
    store: S,
    core: Core,
}

impl<S: TripleWriter> ForwardReasoner<S> {
    pub fn new(store: S) -> Self {
        ForwardReasoner {
            store,
            core: Core {
                registry: RuleRegistry::default(),
                deletion: HashMap::new(),
                blank_nodes: BlankNodeFactory::new(),
                vocab: Vocab::default(),
                no_order: Rc::new(Vec::new()),
            },
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Registers a parsed rule: one registry entry per body pattern, so
    /// the rule fires whichever body pattern an incoming triple matches.
    /// The rule is immediately applied to the facts already in the store.
    pub fn register(&mut self, rule: ParsedRule) -> Result<()> {
        for (pattern, action) in expand(rule, Vec::new()) {
            self.register_action(pattern, action, Vec::new())?;
        }
        Ok(())
    }

    /// Registers an externally implemented rule callback for a trigger
    /// pattern.
    pub fn register_callback(
        &mut self,
        pattern: TriplePattern,
        name: &'static str,
        apply: fn(&mut Adaptor<'_>, &Triple),
    ) -> Result<()> {
        self.register_action(pattern, RuleAction::Native(NativeRule { name, apply }), Vec::new())
    }

    /// Registers a single rule action, applies it to existing matches, and
    /// saturates whatever that derives.
    pub fn register_action(
        &mut self,
        pattern: TriplePattern,
        action: RuleAction,
        premises: Vec<Triple>,
    ) -> Result<()> {
        debug!(%pattern, "registering rule");
        let core = &mut self.core;
        let mut bulk = BulkInserter::new(&mut self.store);

        let emits = {
            let mut adaptor = Adaptor::new(&bulk);
            adaptor.register_rule(pattern, action, premises);
            core.drain_registrations(&mut adaptor)?;
            adaptor.next_delta
        };
        let delta = core.record_all(&mut bulk, emits)?;
        core.saturate(&mut bulk, delta)?;
        bulk.commit()?;
        Ok(())
    }

    /// Inserts a fact and saturates to fixpoint.
    pub fn insert(&mut self, triple: Triple) -> Result<()> {
        debug!(%triple, "insert");
        let core = &mut self.core;
        let mut bulk = BulkInserter::new(&mut self.store);
        bulk.insert(triple.clone());
        core.saturate(&mut bulk, BTreeSet::from([triple]))?;
        bulk.commit()?;
        Ok(())
    }

    /// Inserts a batch; the delta is the entire batch, not one triple at a
    /// time.
    pub fn bulk_insert(&mut self, triples: Vec<Triple>) -> Result<()> {
        let core = &mut self.core;
        let mut bulk = BulkInserter::new(&mut self.store);
        bulk.bulk_insert(triples.clone());
        core.saturate(&mut bulk, triples.into_iter().collect())?;
        bulk.commit()?;
        Ok(())
    }

    /// Retracts a fact: removes it from the store, cascades through its
    /// provenance, and unregisters every rule derived from it.
    pub fn delete(&mut self, triple: &Triple) -> Result<bool> {
        debug!(%triple, "delete");
        let removed = self.store.delete(triple)?;
        self.core.cascade(&mut self.store, triple)?;
        Ok(removed)
    }
}

/// Expands a parsed rule into per-trigger registry entries.
fn expand(rule: ParsedRule, premises: Vec<Triple>) -> Vec<(TriplePattern, RuleAction)> {
    let ParsedRule {
        body,
        constraints,
        head,
    } = rule;

    body.iter()
        .enumerate()
        .map(|(i, trigger)| {
            let rest: Vec<TriplePattern> = body
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, p)| p.clone())
                .collect();
            let action = match &head {
                RuleHead::Patterns(patterns) => RuleAction::Simple(SimpleRule {
                    trigger: trigger.clone(),
                    rest,
                    constraints: constraints.clone(),
                    head: patterns.clone(),
                    premises: premises.clone(),
                }),
                RuleHead::Rules(rules) => RuleAction::Register(RegisterRule {
                    trigger: trigger.clone(),
                    rest,
                    constraints: constraints.clone(),
                    rules: rules.clone(),
                }),
            };
            (trigger.clone(), action)
        })
        .collect()
}

impl Core {
    fn add_rule(&mut self, pattern: &TriplePattern, action: RuleAction, premises: &[Triple]) {
        self.registry.add(pattern, action.clone());
        for premise in premises {
            self.deletion
                .entry(premise.clone())
                .or_default()
                .push((pattern.clone(), action.clone()));
        }
    }

    /// Drains the delta worklist: fire rules, record their emissions, and
    /// repeat with whatever was actually new until nothing is.
    fn saturate<S: TripleWriter>(
        &mut self,
        bulk: &mut BulkInserter<'_, S>,
        mut delta: BTreeSet<Triple>,
    ) -> Result<()> {
        while !delta.is_empty() {
            debug!(delta = delta.len(), "saturation pass");
            let emits = self.fire_rules(bulk, &delta)?;
            delta = self.record_all(bulk, emits)?;
        }
        Ok(())
    }

    /// Applies every matching rule to every delta triple, then processes
    /// queued rule registrations (running each new rule against the
    /// current merged view). Returns the asserted (triple, premises)
    /// pairs.
    fn fire_rules<S: TripleWriter>(
        &mut self,
        bulk: &BulkInserter<'_, S>,
        delta: &BTreeSet<Triple>,
    ) -> Result<Vec<(Triple, Vec<Triple>)>> {
        let mut adaptor = Adaptor::new(bulk);
        for triple in delta {
            for action in self.registry.matching(triple) {
                self.apply_action(&action, triple, &mut adaptor)?;
            }
        }
        self.drain_registrations(&mut adaptor)?;
        Ok(adaptor.next_delta)
    }

    /// Registers queued rules and applies each to the facts it already
    /// matches. Applications may queue further registrations; the loop
    /// runs until the queue is dry.
    fn drain_registrations(&mut self, adaptor: &mut Adaptor<'_>) -> Result<()> {
        while !adaptor.pending_rules.is_empty() {
            for (pattern, action, premises) in std::mem::take(&mut adaptor.pending_rules) {
                self.add_rule(&pattern, action.clone(), &premises);
                let (solutions, _) = execute(adaptor.reader(), &[pattern], &[], None)?;
                for solution in solutions {
                    let trigger = solution
                        .triples()
                        .iter()
                        .next()
                        .expect("single-pattern match has one source triple")
                        .clone();
                    self.apply_action(&action, &trigger, adaptor)?;
                }
            }
        }
        Ok(())
    }

    fn apply_action(
        &self,
        action: &RuleAction,
        trigger: &Triple,
        adaptor: &mut Adaptor<'_>,
    ) -> Result<()> {
        match action {
            RuleAction::Simple(rule) => self.apply_simple(rule, trigger, adaptor),
            RuleAction::Register(rule) => self.apply_register(rule, trigger, adaptor),
            RuleAction::Native(rule) => {
                (rule.apply)(adaptor, trigger);
                Ok(())
            }
        }
    }

    fn apply_simple(
        &self,
        rule: &SimpleRule,
        trigger: &Triple,
        adaptor: &mut Adaptor<'_>,
    ) -> Result<()> {
        let Some(bindings) = bind_trigger(&rule.trigger, trigger, &self.no_order) else {
            return Ok(());
        };
        let solutions = if rule.rest.is_empty() {
            vec![bindings]
        } else {
            let (solutions, _) = execute(adaptor.reader(), &rule.rest, &[], Some(&bindings))?;
            solutions
        };

        for solution in solutions {
            if !rule.constraints.iter().all(|c| c.satisfied(&solution)) {
                continue;
            }
            let mut premises: BTreeSet<Triple> = rule.premises.iter().cloned().collect();
            premises.extend(solution.triples().iter().cloned());
            let premises: Vec<Triple> = premises.into_iter().collect();

            for head in &rule.head {
                let resolved = head.resolve(&solution);
                let Some(derived) = resolved.ground() else {
                    return Err(Error::UnboundHead(resolved.to_string()));
                };
                adaptor.insert(derived, premises.clone());
            }
        }
        Ok(())
    }

    fn apply_register(
        &self,
        rule: &RegisterRule,
        trigger: &Triple,
        adaptor: &mut Adaptor<'_>,
    ) -> Result<()> {
        let Some(bindings) = bind_trigger(&rule.trigger, trigger, &self.no_order) else {
            return Ok(());
        };
        let solutions = if rule.rest.is_empty() {
            vec![bindings]
        } else {
            let (solutions, _) = execute(adaptor.reader(), &rule.rest, &[], Some(&bindings))?;
            solutions
        };

        for solution in solutions {
            if !rule.constraints.iter().all(|c| c.satisfied(&solution)) {
                continue;
            }
            let premises: Vec<Triple> = solution.triples().iter().cloned().collect();
            for nested in &rule.rules {
                let resolved = nested.resolve(&solution);
                for (pattern, action) in expand(resolved, premises.clone()) {
                    adaptor.register_rule(pattern, action, premises.clone());
                }
            }
        }
        Ok(())
    }

    /// Attempts each emitted derivation; returns the set of triples that
    /// were actually new and so form the next delta.
    fn record_all<S: TripleWriter>(
        &mut self,
        bulk: &mut BulkInserter<'_, S>,
        emits: Vec<(Triple, Vec<Triple>)>,
    ) -> Result<BTreeSet<Triple>> {
        let mut next = BTreeSet::new();
        for (triple, premises) in emits {
            if self.record(bulk, triple.clone(), premises)? {
                next.insert(triple);
            }
        }
        Ok(next)
    }

    /// Inserts a derived triple and its provenance. A re-derivation whose
    /// premises depend on the triple itself is dropped; a re-derivation
    /// whose premise set matches an existing bag records nothing new.
    fn record<S: TripleWriter>(
        &mut self,
        bulk: &mut BulkInserter<'_, S>,
        triple: Triple,
        premises: Vec<Triple>,
    ) -> Result<bool> {
        let inserted = bulk.insert(triple.clone());
        if !inserted && self.is_circular(bulk, &triple, &premises) {
            debug!(%triple, "dropping circular re-derivation");
            return Ok(inserted);
        }

        let subject = Term::reified(triple);
        if premises.len() == 1 {
            bulk.insert(Triple::new(
                subject,
                self.vocab.inferred_from.clone(),
                Term::reified(premises.into_iter().next().unwrap()),
            ));
            return Ok(inserted);
        }

        let members: Vec<Term> = premises.iter().cloned().map(Term::reified).collect();
        if !inserted {
            let bags: Vec<Term> = bulk
                .leaf(
                    IndexOrder::Spo,
                    &subject,
                    &self.vocab.inferred_from,
                    Order::Ascending,
                )
                .collect();
            for bag in bags {
                if !bulk.contains(&Triple::new(
                    bag.clone(),
                    self.vocab.rdf_type.clone(),
                    self.vocab.bag.clone(),
                )) {
                    continue;
                }
                let existing: Vec<Term> = bulk
                    .leaf(IndexOrder::Spo, &bag, &self.vocab.member, Order::Ascending)
                    .collect();
                if existing == members {
                    return Ok(inserted);
                }
            }
        }

        let node = Term::BlankNode(self.blank_nodes.fresh());
        bulk.insert(Triple::new(
            node.clone(),
            self.vocab.rdf_type.clone(),
            self.vocab.bag.clone(),
        ));
        bulk.insert(Triple::new(
            subject,
            self.vocab.inferred_from.clone(),
            node.clone(),
        ));
        for member in members {
            bulk.insert(Triple::new(node.clone(), self.vocab.member.clone(), member));
        }
        Ok(inserted)
    }

    /// A derivation is circular when any premise is itself justified by
    /// the derived triple, directly or through a bag the derived triple
    /// belongs to.
    fn is_circular<S: TripleWriter>(
        &self,
        bulk: &BulkInserter<'_, S>,
        triple: &Triple,
        premises: &[Triple],
    ) -> bool {
        let subject = Term::reified(triple.clone());
        let bags: Vec<Term> = bulk
            .leaf(
                IndexOrder::Ops,
                &subject,
                &self.vocab.member,
                Order::Ascending,
            )
            .collect();

        for premise in premises {
            let premise_term = Term::reified(premise.clone());
            if bulk.contains(&Triple::new(
                premise_term.clone(),
                self.vocab.inferred_from.clone(),
                subject.clone(),
            )) {
                return true;
            }
            for bag in &bags {
                if bulk.contains(&Triple::new(
                    premise_term.clone(),
                    self.vocab.inferred_from.clone(),
                    bag.clone(),
                )) {
                    return true;
                }
            }
        }
        false
    }

    /// The retraction cascade for one removed triple: direct dependents
    /// are deleted outright; bag-supported dependents lose this bag and
    /// are deleted only when no other `inferred_from` support remains.
    fn cascade<S: TripleWriter>(&mut self, store: &mut S, deleted: &Triple) -> Result<()> {
        let target = Term::reified(deleted.clone());

        let predicates: Vec<Term> = store
            .branches(IndexOrder::Ops, &target, Order::Ascending)
            .collect();
        for predicate in predicates {
            let dependents: Vec<Term> = store
                .leaf(IndexOrder::Ops, &target, &predicate, Order::Ascending)
                .collect();
            for dependent in dependents {
                if predicate == self.vocab.inferred_from {
                    store.delete(&Triple::new(
                        dependent.clone(),
                        self.vocab.inferred_from.clone(),
                        target.clone(),
                    ))?;
                    if let Term::Triple(dead) = dependent {
                        self.retract(store, &dead)?;
                    }
                } else if self.type_of(store, &dependent) == Some(self.vocab.bag.clone()) {
                    let supported: Vec<Term> = store
                        .leaf(
                            IndexOrder::Ops,
                            &dependent,
                            &self.vocab.inferred_from,
                            Order::Ascending,
                        )
                        .collect();
                    for triple_term in supported {
                        store.delete(&Triple::new(
                            triple_term.clone(),
                            self.vocab.inferred_from.clone(),
                            dependent.clone(),
                        ))?;
                        let still_supported = store
                            .leaf(
                                IndexOrder::Spo,
                                &triple_term,
                                &self.vocab.inferred_from,
                                Order::Ascending,
                            )
                            .next()
                            .is_some();
                        if !still_supported {
                            if let Term::Triple(dead) = triple_term {
                                self.retract(store, &dead)?;
                            }
                        }
                    }
                    self.delete_node(store, &dependent)?;
                }
            }
        }

        if let Some(rules) = self.deletion.remove(deleted) {
            for (pattern, action) in rules {
                debug!(%pattern, "removing rule derived from deleted fact");
                self.registry.remove(&pattern, &action);
            }
        }
        Ok(())
    }

    fn retract<S: TripleWriter>(&mut self, store: &mut S, triple: &Triple) -> Result<()> {
        store.delete(triple)?;
        self.cascade(store, triple)
    }

    /// Deletes every triple with `node` in subject position.
    fn delete_node<S: TripleWriter>(&mut self, store: &mut S, node: &Term) -> Result<()> {
        let predicates: Vec<Term> = store
            .branches(IndexOrder::Spo, node, Order::Ascending)
            .collect();
        for predicate in predicates {
            let objects: Vec<Term> = store
                .leaf(IndexOrder::Spo, node, &predicate, Order::Ascending)
                .collect();
            for object in objects {
                store.delete(&Triple::new(node.clone(), predicate.clone(), object))?;
            }
        }
        Ok(())
    }

    fn type_of<S: TripleWriter>(&self, store: &S, term: &Term) -> Option<Term> {
        store
            .leaf(
                IndexOrder::Spo,
                term,
                &self.vocab.rdf_type,
                Order::Ascending,
            )
            .next()
    }
}
