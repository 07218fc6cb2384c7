use crate::scanner::{self, ObjectRecord};
use crate::{parse_dictionary, Dictionary, Error, Result};
use log::warn;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// A document held as raw bytes.
///
/// Nothing is indexed up front; every operation is a fresh linear scan over
/// the buffer. That keeps damaged files fully inspectable: a broken
/// cross-reference table, overlapping updates or garbage between objects
/// never prevent loading.
pub struct Document {
    buf: Vec<u8>,
}

impl Document {
    /// Load a document from a file path.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let file = File::open(path)?;
        let capacity = Some(file.metadata()?.len() as usize);
        Self::load_internal(file, capacity)
    }

    /// Load a document from an arbitrary source.
    #[inline]
    pub fn load_from<R: Read>(source: R) -> Result<Document> {
        Self::load_internal(source, None)
    }

    fn load_internal<R: Read>(mut source: R, capacity: Option<usize>) -> Result<Document> {
        let mut buf = capacity.map(Vec::with_capacity).unwrap_or_default();
        source.read_to_end(&mut buf)?;
        Ok(Document { buf })
    }

    pub fn from_bytes(buf: Vec<u8>) -> Document {
        Document { buf }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Find the first definition of object `number`.
    pub fn locate(&self, number: u32) -> Result<ObjectRecord> {
        scanner::locate(&self.buf, number)
    }

    /// Every object definition in the document, in byte order. Numbers
    /// defined more than once are kept (the caller sees each definition)
    /// and flagged in the log.
    pub fn objects(&self) -> Vec<ObjectRecord> {
        let records: Vec<ObjectRecord> = scanner::scan(&self.buf).collect();
        let mut seen = HashSet::new();
        for record in &records {
            if !seen.insert(record.number()) {
                warn!(
                    "object {} is defined more than once; lookups use the first definition",
                    record.number()
                );
            }
        }
        records
    }

    /// Parse the dictionary text of a located object. Syntax error offsets
    /// are absolute positions in the document bytes.
    pub fn dictionary(&self, record: &ObjectRecord) -> Result<Dictionary> {
        match parse_dictionary(record.dict_bytes(&self.buf)) {
            Err(Error::Syntax { offset }) => Err(Error::Syntax {
                offset: record.dict.start + offset,
            }),
            other => other,
        }
    }

    /// Raw stream payload of a located object, undecoded.
    pub fn stream_bytes(&self, record: &ObjectRecord) -> Option<&[u8]> {
        record.body_bytes(&self.buf)
    }
}
