use std::collections::HashMap;
use std::io::{self, Write};

use hexastore_model::{BlankNode, Iri, Order, Term, vocab};
use hexastore_store::{IndexOrder, TripleReader};

/// Serialises a store as Turtle.
///
/// IRIs are shortened against `namespaces`, `rdf:type` prints as `a` and
/// leads each predicate list, blank nodes referenced exactly once inline
/// as `[ … ]`, and statements whose subject is a reified triple are
/// emitted after the ordinary ones.
pub fn serialise<W: Write, S: TripleReader + ?Sized>(
    store: &S,
    out: &mut W,
    namespaces: &[(String, Iri)],
) -> io::Result<()> {
    let mut serialiser = Serialiser {
        store,
        namespaces,
        blank_labels: HashMap::new(),
        references: HashMap::new(),
        rdf_type: Term::iri(vocab::RDF_TYPE),
    };
    serialiser.run(out)
}

struct Serialiser<'a, S: ?Sized> {
    store: &'a S,
    namespaces: &'a [(String, Iri)],
    blank_labels: HashMap<BlankNode, String>,
    references: HashMap<Term, usize>,
    rdf_type: Term,
}

impl<S: TripleReader + ?Sized> Serialiser<'_, S> {
    fn run<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        for (name, iri) in self.namespaces {
            writeln!(out, "@prefix {name}: <{}> .", iri.0)?;
        }
        writeln!(out)?;

        for triple in scan_all(self.store) {
            *self.references.entry(triple.o).or_insert(0) += 1;
        }

        // Ordinary subjects first, reified-triple subjects afterwards.
        let mut deferred = Vec::new();
        for subject in self.store.trunks(IndexOrder::Spo, Order::Ascending) {
            if matches!(subject, Term::Triple(_)) {
                deferred.push(subject);
            } else {
                self.statement(out, &subject)?;
            }
        }
        for subject in deferred {
            self.statement(out, &subject)?;
        }
        Ok(())
    }

    fn statement<W: Write>(&mut self, out: &mut W, subject: &Term) -> io::Result<()> {
        if let Term::BlankNode(_) = subject {
            if self.references.get(subject).copied() == Some(1) {
                return Ok(());
            }
        }
        let predicates = self.predicate_object_list(subject, 1)?;
        if !predicates.is_empty() {
            let rendered = self.render(subject);
            writeln!(out, "{rendered} {predicates} .\n")?;
        }
        Ok(())
    }

    /// Renders `p o, o ; p o ...` for a subject, `rdf:type` first.
    fn predicate_object_list(&mut self, subject: &Term, level: usize) -> io::Result<String> {
        let mut predicates: Vec<Term> = self
            .store
            .branches(IndexOrder::Spo, subject, Order::Ascending)
            .collect();
        let rdf_type = self.rdf_type.clone();
        if let Some(index) = predicates.iter().position(|p| *p == rdf_type) {
            predicates.remove(index);
            predicates.insert(0, rdf_type);
        }

        let mut parts = Vec::new();
        for predicate in predicates {
            let objects: Vec<Term> = self
                .store
                .leaf(IndexOrder::Spo, subject, &predicate, Order::Ascending)
                .collect();
            let rendered: Vec<String> = objects
                .into_iter()
                .map(|object| self.object(&object, level))
                .collect::<io::Result<_>>()?;
            if rendered.is_empty() {
                continue;
            }
            parts.push(format!(
                "{} {}",
                self.render(&predicate),
                rendered.join(", ")
            ));
        }
        Ok(parts.join(" ;\n    "))
    }

    fn object(&mut self, object: &Term, level: usize) -> io::Result<String> {
        if let Term::BlankNode(_) = object {
            if self.references.get(object).copied() == Some(1) {
                let nested = self.predicate_object_list(object, level + 1)?;
                return Ok(format!("[\n        {nested}\n    ]"));
            }
        }
        Ok(self.render(object))
    }

    fn render(&mut self, term: &Term) -> String {
        match term {
            _ if *term == self.rdf_type => "a".to_string(),
            Term::Iri(iri) => {
                for (name, prefix) in self.namespaces {
                    if let Some(local) = iri.0.strip_prefix(&prefix.0) {
                        return format!("{name}:{local}");
                    }
                }
                format!("<{}>", iri.0)
            }
            Term::BlankNode(node) => {
                let next = self.blank_labels.len() + 1;
                self.blank_labels
                    .entry(*node)
                    .or_insert_with(|| format!("_:b{next}"))
                    .clone()
            }
            Term::String(s) => quote(s),
            Term::LangString(l) => format!("{}@{}", quote(&l.value), l.language),
            Term::Integer(i) => i.to_string(),
            Term::Decimal(d) => d.to_string(),
            Term::Double(d) => {
                let value = d.0;
                if value == value.trunc() && value.is_finite() {
                    format!("{value:.1}e0")
                } else {
                    format!("{value:e}")
                }
            }
            Term::TypedLiteral(l) => {
                format!(
                    "{}^^{}",
                    quote(&l.lexical),
                    self.render(&Term::Iri(l.datatype.clone()))
                )
            }
            Term::Triple(t) => format!(
                "<< {} {} {} >>",
                self.render(&t.s),
                self.render(&t.p),
                self.render(&t.o)
            ),
        }
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn scan_all<S: TripleReader + ?Sized>(
    store: &S,
) -> impl Iterator<Item = hexastore_model::Triple> + '_ {
    hexastore_store::scan(store, IndexOrder::Spo, [Order::Ascending; 3])
}
