use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No `N G obj` header carrying the requested object number exists in the
    /// scanned bytes.
    #[error("object {0} not found")]
    ObjectNotFound(u32),
    /// A dictionary key the operation requires is absent.
    #[error("missing required dictionary key /{0}")]
    MissingKey(String),
    /// A value has the wrong shape, e.g. an Array where a Reference would be
    /// expected.
    #[error("value has wrong type; expected {expected} but found {found}")]
    ValueType {
        expected: &'static str,
        found: &'static str,
    },
    /// The dictionary text of a located object could not be parsed.
    #[error("malformed dictionary at byte offset {offset}")]
    Syntax { offset: usize },
    /// The stream declares a filter the decoder does not implement.
    #[error("unsupported stream filter /{0}")]
    UnsupportedFilter(String),
    /// Stream data failed to inflate, both as-is and with framing padding
    /// stripped.
    #[error("corrupt stream data: {0}")]
    CorruptData(#[source] io::Error),
    /// The document itself could not be read. This is the only variant that
    /// does not describe a single object.
    #[error(transparent)]
    Io(#[from] io::Error),
}
