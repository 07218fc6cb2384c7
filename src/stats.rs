//! Per-object inspection and stream statistics.
//!
//! Inspection shows an object the way it sits in the file: its dictionary
//! text verbatim plus a hex preview of any stream. The statistics side
//! characterises stream bytes without assuming they decode: entropy of a
//! leading sample, byte diversity of the head and printable-ASCII runs,
//! which is usually enough to tell compressed data, ciphertext and
//! plaintext apart.

use crate::search::decode_body;
use crate::{Document, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bytes of the raw stream shown as a hex preview.
const RAW_PREVIEW: usize = 50;
/// Bytes of the decoded stream shown as a hex preview.
const DECODED_PREVIEW: usize = 20;
/// Sample size for the entropy estimate.
const ENTROPY_SAMPLE: usize = 1000;
/// Head size for the distinct-byte count.
const DISTINCT_SAMPLE: usize = 100;
/// Printable runs shorter than this are noise, not strings.
pub const MIN_ASCII_RUN: usize = 11;
/// Longest run text carried in a report; the length field keeps the truth.
const RUN_TEXT_LIMIT: usize = 100;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub object: u32,
    pub generation: u16,
    /// Byte offset of the object header in the document.
    pub offset: usize,
    /// The dictionary text exactly as it appears in the file.
    pub dictionary: String,
    pub stream: Option<StreamSummary>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub raw_len: usize,
    /// Hex of the first raw bytes.
    pub raw_preview: String,
    /// Present when decoding was requested and succeeded.
    pub decoded: Option<DecodedSummary>,
    /// Present when decoding was requested and failed.
    pub decode_error: Option<String>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSummary {
    pub len: usize,
    /// How the bytes were obtained, see [`crate::DecodedBody::kind`].
    pub kind: String,
    /// Hex of the first decoded bytes.
    pub preview: String,
}

/// Summarise one object: dictionary text plus stream previews.
///
/// With `decode` set, stream bytes are additionally run through the decoder
/// and a decoded preview or the decode error is included. The only failure
/// is the object not existing at all.
pub fn inspect(doc: &Document, number: u32, decode: bool) -> Result<ObjectSummary> {
    let record = doc.locate(number)?;
    let stream = doc.stream_bytes(&record).map(|raw| {
        let mut summary = StreamSummary {
            raw_len: raw.len(),
            raw_preview: hex_preview(raw, RAW_PREVIEW),
            decoded: None,
            decode_error: None,
        };
        if decode {
            match doc.dictionary(&record).and_then(|dict| decode_body(&dict, raw)) {
                Ok(body) => {
                    summary.decoded = Some(DecodedSummary {
                        len: body.data().len(),
                        kind: body.kind().to_string(),
                        preview: hex_preview(body.data(), DECODED_PREVIEW),
                    });
                }
                Err(err) => summary.decode_error = Some(err.to_string()),
            }
        }
        summary
    });
    Ok(ObjectSummary {
        object: record.number(),
        generation: record.generation(),
        offset: record.header.start,
        dictionary: String::from_utf8_lossy(record.dict_bytes(doc.bytes())).into_owned(),
        stream,
    })
}

/// Statistics over the bytes a search would see: the decoded stream when it
/// decodes, the raw bytes otherwise.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StreamStats {
    pub object: u32,
    pub raw_len: usize,
    /// Decoded size, when the stream decodes at all.
    pub decoded_len: Option<usize>,
    pub decode_error: Option<String>,
    /// Shannon entropy, in bits per byte, of the leading sample.
    pub entropy: f64,
    /// Distinct byte values in the leading bytes.
    pub distinct_leading_bytes: usize,
    /// Printable-ASCII runs of at least the requested length.
    pub ascii_runs: Vec<AsciiRun>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiRun {
    pub offset: usize,
    pub len: usize,
    pub text: String,
}

/// Characterise the stream content of one object.
///
/// Readable fragments buried in what a stream decodes to are the
/// signature-hunting signal, so the sample entropy, byte diversity and
/// ASCII runs are taken over the decoded bytes. A stream that does not
/// decode is characterised raw instead, where entropy near eight bits per
/// byte flags compressed or encrypted payloads the dictionary does not
/// admit to. Returns `Ok(None)` when the object exists but carries no
/// stream.
pub fn stream_stats(doc: &Document, number: u32, min_run: usize) -> Result<Option<StreamStats>> {
    let record = doc.locate(number)?;
    let Some(raw) = doc.stream_bytes(&record) else {
        return Ok(None);
    };

    let (decoded_len, decode_error, data) =
        match doc.dictionary(&record).and_then(|dict| decode_body(&dict, raw)) {
            Ok(body) => (Some(body.data().len()), None, body.into_data()),
            Err(err) => (None, Some(err.to_string()), raw.to_vec()),
        };

    Ok(Some(StreamStats {
        object: record.number(),
        raw_len: raw.len(),
        decoded_len,
        decode_error,
        entropy: shannon_entropy(&data[..data.len().min(ENTROPY_SAMPLE)]),
        distinct_leading_bytes: distinct_bytes(&data[..data.len().min(DISTINCT_SAMPLE)]),
        ascii_runs: ascii_runs(&data, min_run),
    }))
}

fn hex_preview(data: &[u8], limit: usize) -> String {
    data.iter()
        .take(limit)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<String>>()
        .join(" ")
}

fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

fn distinct_bytes(data: &[u8]) -> usize {
    let mut seen = [false; 256];
    for &b in data {
        seen[b as usize] = true;
    }
    seen.iter().filter(|&&s| s).count()
}

fn ascii_runs(data: &[u8], min_run: usize) -> Vec<AsciiRun> {
    let min_run = min_run.max(1);
    let mut runs = Vec::new();
    let mut start = None;
    for (i, &b) in data.iter().enumerate() {
        let printable = (0x20..=0x7E).contains(&b);
        match (printable, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_run {
                    runs.push(make_run(data, s, i - s));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if data.len() - s >= min_run {
            runs.push(make_run(data, s, data.len() - s));
        }
    }
    runs
}

fn make_run(data: &[u8], offset: usize, len: usize) -> AsciiRun {
    AsciiRun {
        offset,
        len,
        text: String::from_utf8_lossy(&data[offset..offset + len.min(RUN_TEXT_LIMIT)]).into_owned(),
    }
}
