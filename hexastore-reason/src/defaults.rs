use hexastore_store::TripleWriter;

use crate::error::Result;
use crate::parser::parse_and_register;
use crate::reasoner::ForwardReasoner;

const RDFS_RULES: &str = include_str!("../rules/rdfs.mtt");
const OWL_RULES: &str = include_str!("../rules/owl.mtt");

/// A reasoner preloaded with the stock RDFS/OWL rule pack:
/// `rdfs:domain`/`rdfs:range` type inference, `rdfs:subClassOf` type
/// propagation, `rdfs:subPropertyOf` predicate lifting, and the
/// `owl:SymmetricProperty` / `owl:inverseOf` / `owl:TransitiveProperty`
/// closures. The pack is ordinary rule-DSL data, not special cases.
pub fn default_reasoner<S: TripleWriter>(store: S) -> Result<ForwardReasoner<S>> {
    let mut reasoner = ForwardReasoner::new(store);
    parse_and_register(RDFS_RULES, &mut reasoner)?;
    parse_and_register(OWL_RULES, &mut reasoner)?;
    Ok(reasoner)
}
