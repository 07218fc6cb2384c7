//! Forensic access to PDF objects and streams.
//!
//! Objects are found by a linear textual scan for `N G obj` headers, never
//! through the cross-reference table, so damaged, truncated or deliberately
//! misleading documents stay inspectable. On top of the locator sit a
//! dictionary reader, a Flate-only stream decoder and the operations used
//! when hunting watermarks and tracking identifiers: stream dumps, needle
//! searches, page walks, soft-mask graphs and stream statistics.
//!
//! ```no_run
//! use pdfprobe::{Document, search_streams};
//!
//! # fn main() -> pdfprobe::Result<()> {
//! let doc = Document::load("suspect.pdf")?;
//! let report = search_streams(&doc, &["CONFIDENTIAL".to_string()]);
//! for hit in &report.hits {
//!     println!("object {}: {} match(es)", hit.object, hit.matches.len());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub use error::{Error, Result};

mod object;
pub use object::{Dictionary, ObjectId, Value};

mod parser;
pub use parser::parse_dictionary;

mod scanner;
pub use scanner::{locate, scan, ObjectRecord, Objects};

mod filters;
pub use filters::{decode, FilterChain};

mod document;
pub use document::Document;

mod search;
pub use search::{
    decode_body, find_matches, search_streams, ContextWindow, DecodedBody, Match, SearchReport, StreamHit,
    PAGE_WINDOW, STREAM_WINDOW,
};

mod pages;
pub use pages::{
    list_contents, walk_pages, ContentStatus, ContentStream, ContentsReport, PageContents, PageReport,
    PageWalk, SharedStream,
};

mod smask;
pub use smask::{smask_graph, SmaskEdge, SmaskReport};

mod stats;
pub use stats::{
    inspect, stream_stats, AsciiRun, DecodedSummary, ObjectSummary, StreamStats, StreamSummary,
    MIN_ASCII_RUN,
};
