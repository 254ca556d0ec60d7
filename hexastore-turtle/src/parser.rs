use std::collections::{BTreeMap, HashMap};

use hexastore_model::{
    BlankNode, BlankNodeFactory, Iri, LangString, Namespace, Term, Triple, TypedLiteral, vocab,
};

use crate::error::{Error, Result};

/// Parses a Turtle (or N-Triples) document, pushing each triple to
/// `insert` and returning the prefix map declared by the document.
pub fn parse(
    document: &str,
    factory: &BlankNodeFactory,
    mut insert: impl FnMut(Term, Term, Term),
) -> Result<BTreeMap<String, Namespace>> {
    let tokens = lex(document)?;
    let mut parser = Parser {
        tokens,
        position: 0,
        namespaces: BTreeMap::new(),
        base: None,
        labels: HashMap::new(),
        factory,
    };
    parser.document(&mut insert)?;
    Ok(parser.namespaces)
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    AtPrefix,
    AtBase,
    SparqlPrefix,
    SparqlBase,
    PName { prefix: String, local: String },
    IriRef(String),
    BlankLabel(String),
    Str(String),
    LangTag(String),
    Caret2,
    Integer(i64),
    Decimal(String),
    Double(f64),
    A,
    True,
    False,
    LBracket,
    RBracket,
    QuoteOpen,
    QuoteClose,
    Semicolon,
    Comma,
    Dot,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
}

struct Lexer {
    chars: Vec<char>,
    position: usize,
    line: usize,
}

fn lex(document: &str) -> Result<Vec<Token>> {
    let mut lexer = Lexer {
        chars: document.chars().collect(),
        position: 0,
        line: 1,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        line: lexer.line,
    });
    Ok(tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        if c == '\n' {
            self.line += 1;
        }
        self.position += 1;
        Some(c)
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            line: self.line,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        loop {
            match self.peek() {
                None => return Ok(None),
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(_) => break,
            }
        }

        let c = self.peek().unwrap();
        let token = match c {
            ';' => {
                self.bump();
                self.token(TokenKind::Semicolon)
            }
            ',' => {
                self.bump();
                self.token(TokenKind::Comma)
            }
            '[' => {
                self.bump();
                self.token(TokenKind::LBracket)
            }
            ']' => {
                self.bump();
                self.token(TokenKind::RBracket)
            }
            '^' => {
                self.bump();
                if self.peek() != Some('^') {
                    return Err(Error::parse(self.line, "expected '^^'"));
                }
                self.bump();
                self.token(TokenKind::Caret2)
            }
            '@' => {
                self.bump();
                let word = self.name();
                match word.as_str() {
                    "prefix" => self.token(TokenKind::AtPrefix),
                    "base" => self.token(TokenKind::AtBase),
                    _ => self.token(TokenKind::LangTag(word)),
                }
            }
            '<' => {
                if self.peek_at(1) == Some('<') {
                    self.bump();
                    self.bump();
                    self.token(TokenKind::QuoteOpen)
                } else {
                    self.bump();
                    let mut iri = String::new();
                    loop {
                        match self.bump() {
                            Some('>') => break,
                            Some(c) => iri.push(c),
                            None => {
                                return Err(Error::parse(self.line, "unterminated IRI reference"));
                            }
                        }
                    }
                    self.token(TokenKind::IriRef(iri))
                }
            }
            '>' => {
                if self.peek_at(1) == Some('>') {
                    self.bump();
                    self.bump();
                    self.token(TokenKind::QuoteClose)
                } else {
                    return Err(Error::parse(self.line, "unexpected '>'"));
                }
            }
            '_' => {
                self.bump();
                if self.peek() != Some(':') {
                    return Err(Error::parse(self.line, "expected ':' after '_'"));
                }
                self.bump();
                let label = self.name();
                if label.is_empty() {
                    return Err(Error::parse(self.line, "empty blank node label"));
                }
                self.token(TokenKind::BlankLabel(label))
            }
            '"' | '\'' => {
                let line = self.line;
                let value = self.string(c)?;
                Token {
                    kind: TokenKind::Str(value),
                    line,
                }
            }
            '.' => {
                // A dot starts a number only when a digit follows.
                if self.peek_at(1).is_some_and(|next| next.is_ascii_digit()) {
                    self.number()?
                } else {
                    self.bump();
                    self.token(TokenKind::Dot)
                }
            }
            '+' | '-' => self.number()?,
            _ if c.is_ascii_digit() => self.number()?,
            _ if c.is_alphabetic() => {
                let word = self.name();
                match word.as_str() {
                    "a" if self.peek() != Some(':') => self.token(TokenKind::A),
                    "true" if self.peek() != Some(':') => self.token(TokenKind::True),
                    "false" if self.peek() != Some(':') => self.token(TokenKind::False),
                    "PREFIX" if self.peek() != Some(':') => self.token(TokenKind::SparqlPrefix),
                    "BASE" if self.peek() != Some(':') => self.token(TokenKind::SparqlBase),
                    _ => {
                        if self.peek() != Some(':') {
                            return Err(Error::parse(
                                self.line,
                                format!("expected ':' after {word}"),
                            ));
                        }
                        self.bump();
                        let local = self.name();
                        self.token(TokenKind::PName {
                            prefix: word,
                            local,
                        })
                    }
                }
            }
            ':' => {
                // Empty prefix.
                self.bump();
                let local = self.name();
                self.token(TokenKind::PName {
                    prefix: String::new(),
                    local,
                })
            }
            _ => {
                return Err(Error::parse(
                    self.line,
                    format!("unexpected character {c:?}"),
                ));
            }
        };
        Ok(Some(token))
    }

    fn name(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            let continues = c.is_alphanumeric()
                || c == '_'
                || (c == '-' && self.peek_at(1).is_some_and(|n| n.is_alphanumeric()))
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_alphanumeric() || n == '_'));
            if !continues {
                break;
            }
            out.push(self.bump().unwrap());
        }
        out
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let long = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        if long {
            self.bump();
            self.bump();
            self.bump();
        } else {
            self.bump();
        }

        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(Error::parse(self.line, "unterminated string")),
                Some('\\') => out.push(self.escape()?),
                Some(c) if c == quote => {
                    if !long {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        return Ok(out);
                    }
                    out.push(c);
                }
                Some(c) => {
                    if c == '\n' && !long {
                        return Err(Error::parse(self.line, "newline in short string"));
                    }
                    out.push(c);
                }
            }
        }
    }

    fn escape(&mut self) -> Result<char> {
        match self.bump() {
            Some('t') => Ok('\t'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some('\\') => Ok('\\'),
            Some('u') => self.unicode_escape(4),
            Some('U') => self.unicode_escape(8),
            other => Err(Error::parse(
                self.line,
                format!("unknown escape {other:?}"),
            )),
        }
    }

    fn unicode_escape(&mut self, digits: usize) -> Result<char> {
        let mut value = 0u32;
        for _ in 0..digits {
            let c = self
                .bump()
                .ok_or_else(|| Error::parse(self.line, "truncated unicode escape"))?;
            value = value * 16
                + c.to_digit(16)
                    .ok_or_else(|| Error::parse(self.line, "invalid unicode escape"))?;
        }
        char::from_u32(value).ok_or_else(|| Error::parse(self.line, "invalid unicode code point"))
    }

    fn number(&mut self) -> Result<Token> {
        let line = self.line;
        let mut text = String::new();
        if matches!(self.peek(), Some('+') | Some('-')) {
            text.push(self.bump().unwrap());
        }
        let mut seen_dot = false;
        let mut seen_exponent = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => text.push(self.bump().unwrap()),
                '.' if !seen_dot
                    && !seen_exponent
                    && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) =>
                {
                    seen_dot = true;
                    text.push(self.bump().unwrap());
                }
                'e' | 'E' if !seen_exponent => {
                    seen_exponent = true;
                    text.push(self.bump().unwrap());
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        text.push(self.bump().unwrap());
                    }
                }
                _ => break,
            }
        }

        let kind = if seen_exponent {
            TokenKind::Double(
                text.parse()
                    .map_err(|_| Error::parse(line, format!("invalid double {text}")))?,
            )
        } else if seen_dot {
            TokenKind::Decimal(text)
        } else {
            TokenKind::Integer(
                text.parse()
                    .map_err(|_| Error::parse(line, format!("invalid integer {text}")))?,
            )
        };
        Ok(Token { kind, line })
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    namespaces: BTreeMap<String, Namespace>,
    base: Option<Iri>,
    labels: HashMap<String, BlankNode>,
    factory: &'a BlankNodeFactory,
}

impl Parser<'_> {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.position].kind
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

    fn document(&mut self, insert: &mut impl FnMut(Term, Term, Term)) -> Result<()> {
        loop {
            match self.peek() {
                TokenKind::Eof => return Ok(()),
                TokenKind::AtPrefix => {
                    self.advance();
                    self.prefix_declaration()?;
                    self.expect(TokenKind::Dot, "after @prefix")?;
                }
                TokenKind::AtBase => {
                    self.advance();
                    self.base_declaration()?;
                    self.expect(TokenKind::Dot, "after @base")?;
                }
                TokenKind::SparqlPrefix => {
                    self.advance();
                    self.prefix_declaration()?;
                }
                TokenKind::SparqlBase => {
                    self.advance();
                    self.base_declaration()?;
                }
                _ => self.statement(insert)?,
            }
        }
    }

    fn prefix_declaration(&mut self) -> Result<()> {
        let line = self.line();
        let name = match self.advance() {
            TokenKind::PName { prefix, local } if local.is_empty() => prefix,
            other => {
                return Err(Error::parse(
                    line,
                    format!("expected a prefix name, found {other:?}"),
                ));
            }
        };
        let iri = self.iri_ref()?;
        self.namespaces
            .insert(name.clone(), Namespace::new(name, iri));
        Ok(())
    }

    fn base_declaration(&mut self) -> Result<()> {
        self.base = Some(self.iri_ref()?);
        Ok(())
    }

    fn iri_ref(&mut self) -> Result<Iri> {
        let line = self.line();
        match self.advance() {
            TokenKind::IriRef(iri) => Ok(self.resolve(iri)),
            other => Err(Error::parse(
                line,
                format!("expected an IRI, found {other:?}"),
            )),
        }
    }

    fn resolve(&self, iri: String) -> Iri {
        match &self.base {
            Some(base) if !iri.contains(':') => Iri::new(format!("{}{}", base.0, iri)),
            _ => Iri::new(iri),
        }
    }

    fn statement(&mut self, insert: &mut impl FnMut(Term, Term, Term)) -> Result<()> {
        let subject = self.subject(insert)?;
        self.predicate_object_list(&subject, insert)?;
        self.expect(TokenKind::Dot, "to terminate a statement")?;
        Ok(())
    }

    fn subject(&mut self, insert: &mut impl FnMut(Term, Term, Term)) -> Result<Term> {
        match self.peek() {
            TokenKind::LBracket => {
                self.advance();
                let node = Term::BlankNode(self.factory.fresh());
                if *self.peek() != TokenKind::RBracket {
                    self.predicate_object_list(&node, insert)?;
                }
                self.expect(TokenKind::RBracket, "to close a blank node")?;
                Ok(node)
            }
            _ => self.term(insert, Position::Subject),
        }
    }

    fn predicate_object_list(
        &mut self,
        subject: &Term,
        insert: &mut impl FnMut(Term, Term, Term),
    ) -> Result<()> {
        loop {
            let verb = self.term(insert, Position::Predicate)?;
            loop {
                let object = self.object(insert)?;
                insert(subject.clone(), verb.clone(), object);
                if *self.peek() == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
            if *self.peek() == TokenKind::Semicolon {
                self.advance();
                // Trailing ';' before '.' or ']'.
                if matches!(self.peek(), TokenKind::Dot | TokenKind::RBracket) {
                    return Ok(());
                }
            } else {
                return Ok(());
            }
        }
    }

    fn object(&mut self, insert: &mut impl FnMut(Term, Term, Term)) -> Result<Term> {
        match self.peek() {
            TokenKind::LBracket => {
                self.advance();
                let node = Term::BlankNode(self.factory.fresh());
                if *self.peek() != TokenKind::RBracket {
                    self.predicate_object_list(&node, insert)?;
                }
                self.expect(TokenKind::RBracket, "to close a blank node")?;
                Ok(node)
            }
            _ => self.term(insert, Position::Object),
        }
    }

    fn term(
        &mut self,
        insert: &mut impl FnMut(Term, Term, Term),
        position: Position,
    ) -> Result<Term> {
        let line = self.line();
        match self.advance() {
            TokenKind::IriRef(iri) => Ok(Term::Iri(self.resolve(iri))),
            TokenKind::PName { prefix, local } => {
                let namespace = self.namespaces.get(&prefix).ok_or_else(|| {
                    Error::parse(line, format!("unknown prefix {prefix}:"))
                })?;
                Ok(Term::Iri(namespace.term(&local)))
            }
            TokenKind::A if position == Position::Predicate => Ok(Term::iri(vocab::RDF_TYPE)),
            TokenKind::BlankLabel(label) if position != Position::Predicate => {
                let node = *self
                    .labels
                    .entry(label)
                    .or_insert_with(|| self.factory.fresh());
                Ok(Term::BlankNode(node))
            }
            TokenKind::QuoteOpen if position != Position::Predicate => {
                let s = self.term(insert, Position::Subject)?;
                let p = self.term(insert, Position::Predicate)?;
                let o = self.term(insert, Position::Object)?;
                self.expect(TokenKind::QuoteClose, "to close a quoted triple")?;
                Ok(Term::reified(Triple::new(s, p, o)))
            }
            TokenKind::Str(value) if position == Position::Object => self.literal(value),
            TokenKind::Integer(value) if position == Position::Object => Ok(Term::Integer(value)),
            TokenKind::Decimal(text) if position == Position::Object => Ok(Term::Decimal(
                text.parse()
                    .map_err(|_| Error::parse(line, format!("invalid decimal {text}")))?,
            )),
            TokenKind::Double(value) if position == Position::Object => Ok(Term::double(value)),
            TokenKind::True if position == Position::Object => Ok(Term::TypedLiteral(
                TypedLiteral {
                    lexical: "true".into(),
                    datatype: Iri::new("http://www.w3.org/2001/XMLSchema#boolean"),
                },
            )),
            TokenKind::False if position == Position::Object => Ok(Term::TypedLiteral(
                TypedLiteral {
                    lexical: "false".into(),
                    datatype: Iri::new("http://www.w3.org/2001/XMLSchema#boolean"),
                },
            )),
            other => Err(Error::parse(
                line,
                format!("unexpected {other:?} in {position:?} position"),
            )),
        }
    }

    /// A string literal, possibly followed by a language tag or datatype.
    fn literal(&mut self, value: String) -> Result<Term> {
        match self.peek() {
            TokenKind::LangTag(_) => {
                let TokenKind::LangTag(language) = self.advance() else {
                    unreachable!()
                };
                Ok(Term::LangString(LangString { value, language }))
            }
            TokenKind::Caret2 => {
                self.advance();
                let line = self.line();
                let datatype = match self.advance() {
                    TokenKind::IriRef(iri) => self.resolve(iri),
                    TokenKind::PName { prefix, local } => {
                        let namespace = self.namespaces.get(&prefix).ok_or_else(|| {
                            Error::parse(line, format!("unknown prefix {prefix}:"))
                        })?;
                        namespace.term(&local)
                    }
                    other => {
                        return Err(Error::parse(
                            line,
                            format!("expected a datatype IRI, found {other:?}"),
                        ));
                    }
                };
                Ok(match datatype.as_str() {
                    vocab::XSD_STRING => Term::String(value),
                    vocab::XSD_INTEGER => Term::Integer(
                        value
                            .parse()
                            .map_err(|_| Error::parse(line, format!("invalid integer {value}")))?,
                    ),
                    vocab::XSD_DECIMAL => Term::Decimal(
                        value
                            .parse()
                            .map_err(|_| Error::parse(line, format!("invalid decimal {value}")))?,
                    ),
                    vocab::XSD_DOUBLE => Term::double(
                        value
                            .parse()
                            .map_err(|_| Error::parse(line, format!("invalid double {value}")))?,
                    ),
                    _ => Term::TypedLiteral(TypedLiteral {
                        lexical: value,
                        datatype,
                    }),
                })
            }
            _ => Ok(Term::String(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Subject,
    Predicate,
    Object,
}
