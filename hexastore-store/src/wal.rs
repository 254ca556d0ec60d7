use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use hexastore_model::{
    BlankNode, BlankNodeFactory, Iri, LangString, Term, Triple, TypedLiteral,
};
use tracing::debug;

use crate::error::{Error, Result};

const MAGIC: &[u8; 8] = b"HEXWAL01";
// magic + u32 entry count + u64 tail offset
const HEADER_LEN: u64 = 20;
const MAX_RECORD: u64 = 256 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalEntry {
    Insert(Triple),
    BulkInsert(Vec<Triple>),
    Delete(Triple),
}

impl WalEntry {
    fn record_type(&self) -> u8 {
        match self {
            WalEntry::Insert(_) => 1,
            WalEntry::BulkInsert(_) => 2,
            WalEntry::Delete(_) => 3,
        }
    }
}

/// Append-only log of store mutations.
///
/// Layout: a fixed header (`magic`, entry count, tail offset; rewritten
/// after every append) followed by records of `[len][crc32][body]`. Bodies
/// are tag-coded terms; blank nodes are written as small integers in
/// encounter order and decoded back through a replay factory, so labels
/// survive restarts without persisting factory state.
pub struct Wal {
    file: File,
    entries: u32,
    offset: u64,
    blank_ids: HashMap<BlankNode, u64>,
}

impl Wal {
    /// Opens (or creates) a log and returns it along with every decoded
    /// entry in append order. The entry's position in the returned vector
    /// is its log position.
    pub fn open(path: impl AsRef<Path>, factory: &BlankNodeFactory) -> Result<(Wal, Vec<WalEntry>)> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len == 0 {
            file.write_all(MAGIC)?;
            file.write_all(&0u32.to_le_bytes())?;
            file.write_all(&HEADER_LEN.to_le_bytes())?;
            file.sync_data()?;
            return Ok((
                Wal {
                    file,
                    entries: 0,
                    offset: HEADER_LEN,
                    blank_ids: HashMap::new(),
                },
                Vec::new(),
            ));
        }

        let mut bytes = Vec::with_capacity(file_len as usize);
        file.seek(SeekFrom::Start(0))?;
        file.read_to_end(&mut bytes)?;

        if bytes.len() < HEADER_LEN as usize || &bytes[..8] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let entries = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
        let offset = u64::from_le_bytes(bytes[12..20].try_into().unwrap());
        if offset > bytes.len() as u64 {
            return Err(Error::WalProtocol("tail offset past end of file"));
        }

        let mut decoded = Vec::with_capacity(entries as usize);
        let mut blanks: Vec<BlankNode> = Vec::new();
        let mut cursor = Cursor {
            data: &bytes[..offset as usize],
            position: HEADER_LEN as usize,
        };
        for _ in 0..entries {
            let record_offset = cursor.position as u64;
            let body_len = cursor.u32()? as usize;
            if body_len as u64 > MAX_RECORD {
                return Err(Error::WalRecordTooLarge(body_len as u64));
            }
            let checksum = cursor.u32()?;
            let body = cursor.bytes(body_len)?;
            if crc32fast::hash(body) != checksum {
                return Err(Error::WalChecksumMismatch {
                    offset: record_offset,
                });
            }
            let mut body_cursor = Cursor {
                data: body,
                position: 0,
            };
            decoded.push(decode_entry(&mut body_cursor, &mut blanks, factory)?);
        }
        debug!(entries, "replayed log");

        let blank_ids = blanks
            .into_iter()
            .enumerate()
            .map(|(id, node)| (node, id as u64))
            .collect();

        Ok((
            Wal {
                file,
                entries,
                offset,
                blank_ids,
            },
            decoded,
        ))
    }

    pub fn len(&self) -> u64 {
        self.entries as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Appends an entry and returns its log position.
    pub fn append(&mut self, entry: &WalEntry) -> Result<u64> {
        let mut body = vec![entry.record_type()];
        match entry {
            WalEntry::Insert(triple) | WalEntry::Delete(triple) => {
                self.encode_triple(&mut body, triple);
            }
            WalEntry::BulkInsert(triples) => {
                body.extend_from_slice(&(triples.len() as u32).to_le_bytes());
                for triple in triples {
                    self.encode_triple(&mut body, triple);
                }
            }
        }

        self.file.seek(SeekFrom::Start(self.offset))?;
        self.file.write_all(&(body.len() as u32).to_le_bytes())?;
        self.file.write_all(&crc32fast::hash(&body).to_le_bytes())?;
        self.file.write_all(&body)?;

        self.entries += 1;
        self.offset += 8 + body.len() as u64;

        self.file.seek(SeekFrom::Start(8))?;
        self.file.write_all(&self.entries.to_le_bytes())?;
        self.file.write_all(&self.offset.to_le_bytes())?;
        self.file.sync_data()?;

        Ok((self.entries - 1) as u64)
    }

    fn encode_triple(&mut self, out: &mut Vec<u8>, triple: &Triple) {
        self.encode_term(out, &triple.s);
        self.encode_term(out, &triple.p);
        self.encode_term(out, &triple.o);
    }

    fn encode_term(&mut self, out: &mut Vec<u8>, term: &Term) {
        match term {
            Term::Iri(iri) => {
                out.push(0);
                encode_str(out, &iri.0);
            }
            Term::BlankNode(node) => {
                out.push(1);
                let next = self.blank_ids.len() as u64;
                let id = *self.blank_ids.entry(*node).or_insert(next);
                out.extend_from_slice(&id.to_le_bytes());
            }
            Term::String(s) => {
                out.push(2);
                encode_str(out, s);
            }
            Term::LangString(l) => {
                out.push(3);
                encode_str(out, &l.value);
                encode_str(out, &l.language);
            }
            Term::Integer(i) => {
                out.push(4);
                out.extend_from_slice(&i.to_le_bytes());
            }
            Term::Decimal(d) => {
                out.push(5);
                encode_str(out, &d.to_string());
            }
            Term::Double(d) => {
                out.push(6);
                out.extend_from_slice(&d.0.to_le_bytes());
            }
            Term::TypedLiteral(t) => {
                out.push(7);
                encode_str(out, &t.lexical);
                encode_str(out, &t.datatype.0);
            }
            Term::Triple(t) => {
                out.push(8);
                self.encode_triple(out, t);
            }
        }
    }
}

fn encode_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

struct Cursor<'b> {
    data: &'b [u8],
    position: usize,
}

impl<'b> Cursor<'b> {
    fn bytes(&mut self, len: usize) -> Result<&'b [u8]> {
        let end = self
            .position
            .checked_add(len)
            .ok_or(Error::WalProtocol("record length overflow"))?;
        if end > self.data.len() {
            return Err(Error::WalProtocol("truncated record"));
        }
        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.bytes(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    fn str(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let bytes = self.bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::WalProtocol("invalid utf-8"))
    }
}

fn decode_entry(
    cursor: &mut Cursor<'_>,
    blanks: &mut Vec<BlankNode>,
    factory: &BlankNodeFactory,
) -> Result<WalEntry> {
    match cursor.u8()? {
        1 => Ok(WalEntry::Insert(decode_triple(cursor, blanks, factory)?)),
        2 => {
            let count = cursor.u32()? as usize;
            let mut triples = Vec::with_capacity(count);
            for _ in 0..count {
                triples.push(decode_triple(cursor, blanks, factory)?);
            }
            Ok(WalEntry::BulkInsert(triples))
        }
        3 => Ok(WalEntry::Delete(decode_triple(cursor, blanks, factory)?)),
        _ => Err(Error::WalProtocol("unknown entry kind")),
    }
}

fn decode_triple(
    cursor: &mut Cursor<'_>,
    blanks: &mut Vec<BlankNode>,
    factory: &BlankNodeFactory,
) -> Result<Triple> {
    Ok(Triple {
        s: decode_term(cursor, blanks, factory)?,
        p: decode_term(cursor, blanks, factory)?,
        o: decode_term(cursor, blanks, factory)?,
    })
}

fn decode_term(
    cursor: &mut Cursor<'_>,
    blanks: &mut Vec<BlankNode>,
    factory: &BlankNodeFactory,
) -> Result<Term> {
    match cursor.u8()? {
        0 => Ok(Term::Iri(Iri(cursor.str()?))),
        1 => {
            let id = cursor.u64()? as usize;
            while blanks.len() <= id {
                blanks.push(factory.fresh());
            }
            Ok(Term::BlankNode(blanks[id]))
        }
        2 => Ok(Term::String(cursor.str()?)),
        3 => Ok(Term::LangString(LangString {
            value: cursor.str()?,
            language: cursor.str()?,
        })),
        4 => Ok(Term::Integer(cursor.i64()?)),
        5 => Ok(Term::Decimal(
            cursor
                .str()?
                .parse()
                .map_err(|_| Error::WalProtocol("invalid decimal"))?,
        )),
        6 => Ok(Term::double(cursor.f64()?)),
        7 => Ok(Term::TypedLiteral(TypedLiteral {
            lexical: cursor.str()?,
            datatype: Iri(cursor.str()?),
        })),
        8 => Ok(Term::reified(decode_triple(cursor, blanks, factory)?)),
        _ => Err(Error::WalProtocol("unknown term tag")),
    }
}
