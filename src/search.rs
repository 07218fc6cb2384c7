//! Needle search across decoded stream bytes.
//!
//! This is the layer behind watermark and tracking-identifier hunts: every
//! stream in the document is decoded as well as possible and searched for
//! caller-supplied byte needles. A stream that cannot be decoded is reported
//! and skipped, never fatal.

use crate::filters::{decode, FilterChain};
use crate::scanner::find_bytes;
use crate::{Dictionary, Document, Result};
use log::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How many bytes of context to show around a match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextWindow {
    pub before: usize,
    pub after: usize,
}

/// Window used when sweeping every stream in a document.
pub const STREAM_WINDOW: ContextWindow = ContextWindow { before: 20, after: 50 };

/// Wider window used when walking page content streams, where the match
/// usually sits inside an operator sequence worth reading whole.
pub const PAGE_WINDOW: ContextWindow = ContextWindow { before: 50, after: 100 };

/// One needle occurrence inside a stream.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub needle: String,
    /// Byte offset of the occurrence in the decoded stream.
    pub offset: usize,
    /// Context around the occurrence, end-of-line bytes flattened to spaces.
    pub context: String,
}

/// Outcome of decoding one stream body for searching.
///
/// Searching wants bytes even from sloppy producers, so this is more
/// forgiving than [`crate::decode`]: a stream without any declared filter is
/// sniffed for zlib data and searched raw when the sniff fails.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// The declared filter pipeline was applied.
    Filtered(Vec<u8>),
    /// No filter was declared but the bytes inflated cleanly.
    Inflated(Vec<u8>),
    /// No filter was declared; the raw bytes are searched as-is.
    Raw(Vec<u8>),
}

impl DecodedBody {
    pub fn data(&self) -> &[u8] {
        match self {
            DecodedBody::Filtered(data) | DecodedBody::Inflated(data) | DecodedBody::Raw(data) => data,
        }
    }

    pub fn into_data(self) -> Vec<u8> {
        match self {
            DecodedBody::Filtered(data) | DecodedBody::Inflated(data) | DecodedBody::Raw(data) => data,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DecodedBody::Filtered(_) => "filtered",
            DecodedBody::Inflated(_) => "inflated",
            DecodedBody::Raw(_) => "raw",
        }
    }
}

/// Decode a stream body for searching.
///
/// A declared filter pipeline is applied strictly and its failures
/// propagate. Without a declared filter the bytes are tried as zlib first,
/// since content streams are routinely deflated without a `/Filter` entry
/// in hand-built documents.
pub fn decode_body(dict: &Dictionary, raw: &[u8]) -> Result<DecodedBody> {
    let chain = FilterChain::from_dict(dict)?;
    if !chain.is_identity() {
        return Ok(DecodedBody::Filtered(decode(raw, &chain)?));
    }
    match decode(raw, &FilterChain::flate()) {
        Ok(data) => Ok(DecodedBody::Inflated(data)),
        Err(err) => {
            debug!("no declared filter and not zlib ({err}), searching raw bytes");
            Ok(DecodedBody::Raw(raw.to_vec()))
        }
    }
}

/// Find every occurrence of every needle in `data`. Occurrences of one
/// needle do not overlap; matches are ordered by offset.
pub fn find_matches(data: &[u8], needles: &[String], window: ContextWindow) -> Vec<Match> {
    let mut matches = Vec::new();
    for needle in needles {
        let pattern = needle.as_bytes();
        if pattern.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(pos) = find_bytes(data, from, pattern) {
            matches.push(Match {
                needle: needle.clone(),
                offset: pos,
                context: context_string(data, pos, pattern.len(), window),
            });
            from = pos + pattern.len();
        }
    }
    matches.sort_by_key(|m| m.offset);
    matches
}

fn context_string(data: &[u8], pos: usize, len: usize, window: ContextWindow) -> String {
    let start = pos.saturating_sub(window.before);
    let end = (pos + len + window.after).min(data.len());
    String::from_utf8_lossy(&data[start..end]).replace(['\n', '\r'], " ")
}

/// Result of sweeping every stream in a document for needles.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReport {
    /// Streams that were decoded and searched.
    pub scanned: usize,
    pub hits: Vec<StreamHit>,
    /// Streams that could not be searched, with the reason.
    pub errors: Vec<String>,
}

/// All matches found in one stream.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHit {
    pub object: u32,
    /// How the searched bytes were obtained, see [`DecodedBody::kind`].
    pub kind: String,
    pub matches: Vec<Match>,
}

/// Decode and search every stream in the document.
///
/// Objects without a stream are ignored. A stream whose dictionary or data
/// is unusable lands in [`SearchReport::errors`] and the sweep continues.
pub fn search_streams(doc: &Document, needles: &[String]) -> SearchReport {
    let mut report = SearchReport::default();
    for record in doc.objects() {
        let Some(raw) = doc.stream_bytes(&record) else {
            continue;
        };
        let dict = match doc.dictionary(&record) {
            Ok(dict) => dict,
            Err(err) => {
                report.errors.push(format!("object {}: {err}", record.number()));
                continue;
            }
        };
        let body = match decode_body(&dict, raw) {
            Ok(body) => body,
            Err(err) => {
                report.errors.push(format!("object {}: {err}", record.number()));
                continue;
            }
        };
        report.scanned += 1;
        let matches = find_matches(body.data(), needles, STREAM_WINDOW);
        if !matches.is_empty() {
            report.hits.push(StreamHit {
                object: record.number(),
                kind: body.kind().to_string(),
                matches,
            });
        }
    }
    report
}
