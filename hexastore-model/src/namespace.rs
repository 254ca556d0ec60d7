use std::fmt;

use crate::term::Iri;

/// A prefix binding, e.g. `schema:` for `https://schema.org/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub prefix: Iri,
}

impl Namespace {
    pub fn new(name: impl Into<String>, prefix: Iri) -> Self {
        Namespace {
            name: name.into(),
            prefix,
        }
    }

    /// Expands a local name under this namespace.
    pub fn term(&self, local: &str) -> Iri {
        Iri::new(format!("{}{}", self.prefix.0, local))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.prefix)
    }
}
