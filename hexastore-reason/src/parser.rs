//! Parser for the rule DSL.
//!
//! ```text
//! @prefix schema: <https://schema.org/> .
//!
//! ($child1 schema:parent $parent), ($child2 schema:parent $parent)
//!     st ($child1 is-not $child2)
//!     → ($child1 schema:sibling $child2) .
//!
//! ($p a owl:SymmetricProperty) → (
//!     ($s $p $o) → ($o $p $s) .
//! ) .
//! ```
//!
//! `a` abbreviates `rdf:type` and `∈` abbreviates `rdf:member`; `->` is
//! accepted for `→`. A parenthesised rule block in head position makes a
//! recursive rule; recursive heads cannot nest further.

use std::collections::BTreeMap;

use hexastore_model::{Iri, Namespace, TermPattern, TriplePattern, Variable, vocab};
use hexastore_store::TripleWriter;

use crate::error::{Error, Result};
use crate::reasoner::ForwardReasoner;
use crate::rule::{Constraint, ParsedRule, RuleHead};

/// Parses a rule document.
pub fn parse(document: &str) -> Result<Vec<ParsedRule>> {
    let tokens = lex(document)?;
    Parser {
        tokens,
        position: 0,
        namespaces: BTreeMap::new(),
    }
    .document()
}

/// Parses a rule document and registers every rule with the reasoner.
pub fn parse_and_register<S: TripleWriter>(
    document: &str,
    reasoner: &mut ForwardReasoner<S>,
) -> Result<()> {
    for rule in parse(document)? {
        reasoner.register(rule)?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    AtPrefix,
    PName { prefix: String, local: String },
    IriRef(String),
    Var(String),
    A,
    MemberOf,
    St,
    IsNot,
    LParen,
    RParen,
    Comma,
    Dot,
    Arrow,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

fn lex(document: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = document.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            _ if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '(' => {
                tokens.push(Token {
                    kind: TokenKind::LParen,
                    line,
                });
                i += 1;
            }
            ')' => {
                tokens.push(Token {
                    kind: TokenKind::RParen,
                    line,
                });
                i += 1;
            }
            ',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    line,
                });
                i += 1;
            }
            '.' => {
                tokens.push(Token {
                    kind: TokenKind::Dot,
                    line,
                });
                i += 1;
            }
            '→' => {
                tokens.push(Token {
                    kind: TokenKind::Arrow,
                    line,
                });
                i += 1;
            }
            '∈' => {
                tokens.push(Token {
                    kind: TokenKind::MemberOf,
                    line,
                });
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'>') => {
                tokens.push(Token {
                    kind: TokenKind::Arrow,
                    line,
                });
                i += 2;
            }
            '<' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != '>' {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(Error::parse(line, "unterminated IRI reference"));
                }
                tokens.push(Token {
                    kind: TokenKind::IriRef(chars[start..end].iter().collect()),
                    line,
                });
                i = end + 1;
            }
            '$' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                if end == start {
                    return Err(Error::parse(line, "empty variable name"));
                }
                tokens.push(Token {
                    kind: TokenKind::Var(chars[start..end].iter().collect()),
                    line,
                });
                i = end;
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_name_char(chars[end]) {
                    end += 1;
                }
                let keyword: String = chars[start..end].iter().collect();
                if keyword != "prefix" {
                    return Err(Error::parse(line, format!("unknown directive @{keyword}")));
                }
                tokens.push(Token {
                    kind: TokenKind::AtPrefix,
                    line,
                });
                i = end;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut end = i;
                // A '-' continues a name only when followed by another
                // name character, so "->" still lexes as an arrow.
                while end < chars.len()
                    && (is_name_char(chars[end])
                        || (chars[end] == '-'
                            && chars.get(end + 1).is_some_and(|next| is_name_char(*next))))
                {
                    end += 1;
                }
                let word: String = chars[start..end].iter().collect();
                match word.as_str() {
                    "a" => {
                        tokens.push(Token {
                            kind: TokenKind::A,
                            line,
                        });
                        i = end;
                    }
                    "st" => {
                        tokens.push(Token {
                            kind: TokenKind::St,
                            line,
                        });
                        i = end;
                    }
                    "is-not" => {
                        tokens.push(Token {
                            kind: TokenKind::IsNot,
                            line,
                        });
                        i = end;
                    }
                    _ => {
                        if chars.get(end) != Some(&':') {
                            return Err(Error::parse(
                                line,
                                format!("expected ':' after prefix name {word}"),
                            ));
                        }
                        let local_start = end + 1;
                        let mut local_end = local_start;
                        while local_end < chars.len() && is_name_char(chars[local_end]) {
                            local_end += 1;
                        }
                        tokens.push(Token {
                            kind: TokenKind::PName {
                                prefix: word,
                                local: chars[local_start..local_end].iter().collect(),
                            },
                            line,
                        });
                        i = local_end;
                    }
                }
            }
            _ => return Err(Error::parse(line, format!("unexpected character {c:?}"))),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line,
    });
    Ok(tokens)
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    namespaces: BTreeMap<String, Namespace>,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.position].kind
    }

    fn peek_second(&self) -> &TokenKind {
        &self.tokens[(self.position + 1).min(self.tokens.len() - 1)].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.position].line
    }

    fn advance(&mut self) -> TokenKind {
        let token = self.tokens[self.position].kind.clone();
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: TokenKind, context: &str) -> Result<()> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(Error::parse(
                self.line(),
                format!("expected {expected:?} {context}, found {:?}", self.peek()),
            ))
        }
    }

    fn document(mut self) -> Result<Vec<ParsedRule>> {
        let mut rules = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => return Ok(rules),
                TokenKind::AtPrefix => self.prefix_declaration()?,
                _ => rules.push(self.rule(false)?),
            }
        }
    }

    fn prefix_declaration(&mut self) -> Result<()> {
        self.expect(TokenKind::AtPrefix, "to open a prefix declaration")?;
        let name = match self.advance() {
            TokenKind::PName { prefix, local } if local.is_empty() => prefix,
            other => {
                return Err(Error::parse(
                    self.line(),
                    format!("expected a prefix name, found {other:?}"),
                ));
            }
        };
        let iri = match self.advance() {
            TokenKind::IriRef(iri) => Iri::new(iri),
            other => {
                return Err(Error::parse(
                    self.line(),
                    format!("expected an IRI, found {other:?}"),
                ));
            }
        };
        self.expect(TokenKind::Dot, "to close a prefix declaration")?;
        self.namespaces
            .insert(name.clone(), Namespace::new(name, iri));
        Ok(())
    }

    fn rule(&mut self, nested: bool) -> Result<ParsedRule> {
        let mut body = vec![self.pattern()?];
        while *self.peek() == TokenKind::Comma {
            self.advance();
            body.push(self.pattern()?);
        }

        let mut constraints = Vec::new();
        if *self.peek() == TokenKind::St {
            self.advance();
            constraints.push(self.constraint()?);
            while *self.peek() == TokenKind::Comma {
                self.advance();
                constraints.push(self.constraint()?);
            }
        }

        self.expect(TokenKind::Arrow, "between rule body and head")?;

        let head = if *self.peek() == TokenKind::LParen && *self.peek_second() == TokenKind::LParen
        {
            if nested {
                return Err(Error::parse(
                    self.line(),
                    "recursive rule heads cannot themselves be recursive",
                ));
            }
            self.advance();
            let mut nested_rules = vec![self.rule(true)?];
            while *self.peek() != TokenKind::RParen {
                nested_rules.push(self.rule(true)?);
            }
            self.advance();
            RuleHead::Rules(nested_rules)
        } else {
            let mut patterns = vec![self.pattern()?];
            while *self.peek() == TokenKind::Comma {
                self.advance();
                patterns.push(self.pattern()?);
            }
            RuleHead::Patterns(patterns)
        };

        self.expect(TokenKind::Dot, "to terminate a rule")?;
        Ok(ParsedRule {
            body,
            constraints,
            head,
        })
    }

    fn constraint(&mut self) -> Result<Constraint> {
        self.expect(TokenKind::LParen, "to open a constraint")?;
        let left = self.variable()?;
        self.expect(TokenKind::IsNot, "in a constraint")?;
        let right = self.variable()?;
        self.expect(TokenKind::RParen, "to close a constraint")?;
        Ok(Constraint::IsNot(vec![left, right]))
    }

    fn variable(&mut self) -> Result<Variable> {
        match self.advance() {
            TokenKind::Var(name) => Ok(Variable::new(name)),
            other => Err(Error::parse(
                self.line(),
                format!("expected a variable, found {other:?}"),
            )),
        }
    }

    fn pattern(&mut self) -> Result<TriplePattern> {
        self.expect(TokenKind::LParen, "to open a triple pattern")?;
        let s = self.term(false)?;
        let p = self.term(true)?;
        let o = self.term(false)?;
        self.expect(TokenKind::RParen, "to close a triple pattern")?;
        Ok(TriplePattern { s, p, o })
    }

    fn term(&mut self, predicate: bool) -> Result<TermPattern> {
        let line = self.line();
        match self.advance() {
            TokenKind::Var(name) => Ok(TermPattern::Variable(Variable::new(name))),
            TokenKind::IriRef(iri) => Ok(TermPattern::Term(hexastore_model::Term::iri(iri))),
            TokenKind::PName { prefix, local } => {
                let namespace = self.namespaces.get(&prefix).ok_or_else(|| {
                    Error::parse(line, format!("unknown prefix {prefix}:"))
                })?;
                Ok(TermPattern::Term(hexastore_model::Term::Iri(
                    namespace.term(&local),
                )))
            }
            TokenKind::A if predicate => {
                Ok(TermPattern::Term(hexastore_model::Term::iri(vocab::RDF_TYPE)))
            }
            TokenKind::MemberOf if predicate => Ok(TermPattern::Term(
                hexastore_model::Term::iri(vocab::RDF_MEMBER),
            )),
            other => Err(Error::parse(
                line,
                format!("expected a term, found {other:?}"),
            )),
        }
    }
}
