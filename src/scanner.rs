//! Object locator: a linear textual scan for `N G obj` headers.
//!
//! The scan never consults the cross-reference table, so it sees every
//! object definition the bytes contain, including orphaned or shadowed ones
//! that a conforming reader would skip. Damaged or truncated documents still
//! yield whatever objects remain delimitable.

use crate::{Error, ObjectId, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::bytes::{CaptureMatches, Regex};
use std::ops::Range;

static OBJECT_HEADER: Lazy<Regex> = Lazy::new(|| {
    // The digit runs are captured whole, so object 6 never matches inside
    // the header of object 16.
    Regex::new(r"(?-u)(\d+)[\x00\t\n\x0C\r ]+(\d+)[\x00\t\n\x0C\r ]+obj\b").unwrap()
});

const STREAM: &[u8] = b"stream";
const ENDSTREAM: &[u8] = b"endstream";
const ENDOBJ: &[u8] = b"endobj";

/// One object definition located in the document bytes.
///
/// Only spans are stored; nothing is parsed or decoded yet. The dictionary
/// text is handed to [`crate::parse_dictionary`] on demand and the body to
/// the stream decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub id: ObjectId,
    /// The header, from the first digit of the object number through `obj`.
    pub header: Range<usize>,
    /// The object's value text, normally `<<` through `>>`. Objects whose
    /// value is not a dictionary keep their raw text here and fail later,
    /// at parse time.
    pub dict: Range<usize>,
    /// Stream payload, excluding the end-of-line marker after `stream` and
    /// a single end-of-line marker before `endstream`.
    pub body: Option<Range<usize>>,
}

impl ObjectRecord {
    pub fn number(&self) -> u32 {
        self.id.0
    }

    pub fn generation(&self) -> u16 {
        self.id.1
    }

    pub fn has_stream(&self) -> bool {
        self.body.is_some()
    }

    pub fn dict_bytes<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.dict.clone()]
    }

    pub fn body_bytes<'a>(&self, buf: &'a [u8]) -> Option<&'a [u8]> {
        self.body.clone().map(|range| &buf[range])
    }
}

/// Iterator over every object definition in the bytes, in document order.
pub struct Objects<'a> {
    buf: &'a [u8],
    headers: CaptureMatches<'static, 'a>,
}

impl<'a> Iterator for Objects<'a> {
    type Item = ObjectRecord;

    fn next(&mut self) -> Option<ObjectRecord> {
        loop {
            let caps = self.headers.next()?;
            let header = caps.get(0).map(|m| m.start()..m.end())?;
            let (Some(number), Some(generation)) = (parse_num::<u32>(&caps[1]), parse_num::<u16>(&caps[2])) else {
                debug!("object header at offset {} overflows, skipping", header.start);
                continue;
            };
            let Some((dict, body)) = delimit(self.buf, header.end) else {
                debug!("object {number} at offset {} has no endobj or stream, skipping", header.start);
                continue;
            };
            return Some(ObjectRecord {
                id: (number, generation),
                header,
                dict,
                body,
            });
        }
    }
}

/// Scan the bytes for object definitions.
pub fn scan(buf: &[u8]) -> Objects<'_> {
    Objects {
        buf,
        headers: OBJECT_HEADER.captures_iter(buf),
    }
}

/// Find the first definition of object `number`.
///
/// When a document defines the same object number more than once, the
/// definition earliest in the bytes wins.
pub fn locate(buf: &[u8], number: u32) -> Result<ObjectRecord> {
    scan(buf)
        .find(|record| record.number() == number)
        .ok_or(Error::ObjectNotFound(number))
}

fn parse_num<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

#[inline]
fn is_whitespace(c: u8) -> bool {
    b" \t\n\r\0\x0C".contains(&c)
}

pub(crate) fn find_bytes(buf: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

/// Work out where the object's value text ends and whether a stream body
/// follows. The rule is textual: a `stream` keyword belongs to this object
/// only when the preceding non-whitespace bytes are the dictionary close
/// `>>`; otherwise the value runs until `endobj`.
fn delimit(buf: &[u8], header_end: usize) -> Option<(Range<usize>, Option<Range<usize>>)> {
    let endobj = find_bytes(buf, header_end, ENDOBJ);
    let bound = endobj.unwrap_or(buf.len());

    if let Some(keyword) = stream_keyword(buf, header_end, bound) {
        let dict = trim_range(buf, header_end, keyword);
        let body = stream_body(buf, keyword + STREAM.len());
        if body.is_none() {
            debug!("stream at offset {keyword} has no endstream");
        }
        return Some((dict, body));
    }

    let endobj = endobj?;
    Some((trim_range(buf, header_end, endobj), None))
}

/// First `stream` keyword in `buf[from..bound]` that closes a dictionary.
/// Skips occurrences embedded in values (and the tail of `endstream`),
/// which are never preceded by `>>`.
fn stream_keyword(buf: &[u8], from: usize, bound: usize) -> Option<usize> {
    let mut cursor = from;
    while let Some(pos) = find_bytes(&buf[..bound], cursor, STREAM) {
        let mut p = pos;
        while p > from && is_whitespace(buf[p - 1]) {
            p -= 1;
        }
        if p >= from + 2 && buf[p - 2..p] == b">>"[..] {
            return Some(pos);
        }
        cursor = pos + STREAM.len();
    }
    None
}

/// Span of the stream payload that starts after the `stream` keyword.
///
/// Consumes at most one end-of-line marker after the keyword and excludes
/// one before `endstream`, so payload bytes that happen to end in a line
/// feed survive.
fn stream_body(buf: &[u8], keyword_end: usize) -> Option<Range<usize>> {
    let mut start = keyword_end;
    if start < buf.len() && buf[start] == b'\r' {
        start += 1;
    }
    if start < buf.len() && buf[start] == b'\n' {
        start += 1;
    }
    let mut end = find_bytes(buf, start, ENDSTREAM)?;
    if end > start && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }
    Some(start..end)
}

fn trim_range(buf: &[u8], mut start: usize, mut end: usize) -> Range<usize> {
    while start < end && is_whitespace(buf[start]) {
        start += 1;
    }
    while end > start && is_whitespace(buf[end - 1]) {
        end -= 1;
    }
    start..end
}
