//! Page walk: from `/Type /Page` objects through their `/Contents` chains.
//!
//! Page detection is by exact `/Type` name, so `/Pages` tree nodes are never
//! mistaken for pages. Content streams are fetched by object number through
//! the locator, decoded and searched one by one; each one reports its own
//! outcome.

use crate::search::{decode_body, find_matches, Match, PAGE_WINDOW};
use crate::{Document, Error, Value};
use indexmap::IndexMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of walking every page and searching its content streams.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageWalk {
    pub pages: Vec<PageReport>,
    /// Objects whose dictionary text could not be parsed during the walk.
    pub errors: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PageReport {
    /// Object number of the page.
    pub page: u32,
    /// Content stream object numbers, in `/Contents` order.
    pub contents: Vec<u32>,
    /// Set when `/Contents` exists but is neither a reference nor an array.
    pub contents_error: Option<String>,
    pub streams: Vec<ContentStream>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ContentStream {
    pub object: u32,
    pub status: ContentStatus,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum ContentStatus {
    /// Decoded and searched; nothing found.
    Clean,
    /// The referenced object does not exist or carries no stream.
    Missing,
    /// Located, but its dictionary or data was unusable.
    Failed(String),
    /// Needle occurrences in the decoded stream.
    Matched(Vec<Match>),
}

/// Walk every page and search its content streams for `needles`.
pub fn walk_pages(doc: &Document, needles: &[String]) -> PageWalk {
    let mut walk = PageWalk::default();
    for record in doc.objects() {
        let dict = match doc.dictionary(&record) {
            Ok(dict) => dict,
            Err(err) => {
                walk.errors.push(format!("object {}: {err}", record.number()));
                continue;
            }
        };
        if !dict.type_is(b"Page") {
            continue;
        }

        let mut page = PageReport {
            page: record.number(),
            contents: Vec::new(),
            contents_error: None,
            streams: Vec::new(),
        };
        if let Ok(value) = dict.get(b"Contents") {
            match value {
                Value::Reference(_) | Value::Array(_) => page.contents = value.referenced_objects(),
                other => {
                    page.contents_error = Some(
                        Error::ValueType {
                            expected: "reference or array of references",
                            found: other.enum_variant(),
                        }
                        .to_string(),
                    )
                }
            }
        }
        for &content in &page.contents {
            page.streams.push(ContentStream {
                object: content,
                status: content_status(doc, content, needles),
            });
        }
        walk.pages.push(page);
    }
    walk
}

fn content_status(doc: &Document, number: u32, needles: &[String]) -> ContentStatus {
    let Ok(record) = doc.locate(number) else {
        return ContentStatus::Missing;
    };
    let Some(raw) = doc.stream_bytes(&record) else {
        return ContentStatus::Missing;
    };
    let dict = match doc.dictionary(&record) {
        Ok(dict) => dict,
        Err(err) => return ContentStatus::Failed(err.to_string()),
    };
    let body = match decode_body(&dict, raw) {
        Ok(body) => body,
        Err(err) => return ContentStatus::Failed(err.to_string()),
    };
    let matches = find_matches(body.data(), needles, PAGE_WINDOW);
    if matches.is_empty() {
        ContentStatus::Clean
    } else {
        ContentStatus::Matched(matches)
    }
}

/// Which pages use which content streams.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentsReport {
    pub pages: Vec<PageContents>,
    /// Content streams referenced by more than one page.
    pub shared: Vec<SharedStream>,
    pub errors: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PageContents {
    pub page: u32,
    pub contents: Vec<u32>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SharedStream {
    pub object: u32,
    pub uses: usize,
}

/// List each page's content stream numbers and flag streams shared between
/// pages. Sharing is how a single watermark stream ends up on every page,
/// so a count above one is the interesting signal.
pub fn list_contents(doc: &Document) -> ContentsReport {
    let mut report = ContentsReport::default();
    let mut uses: IndexMap<u32, usize> = IndexMap::new();

    for record in doc.objects() {
        let dict = match doc.dictionary(&record) {
            Ok(dict) => dict,
            Err(err) => {
                report.errors.push(format!("object {}: {err}", record.number()));
                continue;
            }
        };
        if !dict.type_is(b"Page") {
            continue;
        }
        let mut contents = Vec::new();
        if let Ok(value) = dict.get(b"Contents") {
            match value {
                Value::Reference(_) | Value::Array(_) => contents = value.referenced_objects(),
                other => report.errors.push(format!(
                    "object {}: {}",
                    record.number(),
                    Error::ValueType {
                        expected: "reference or array of references",
                        found: other.enum_variant(),
                    }
                )),
            }
        }
        for &content in &contents {
            *uses.entry(content).or_insert(0) += 1;
        }
        report.pages.push(PageContents {
            page: record.number(),
            contents,
        });
    }

    report.shared = uses
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(object, uses)| SharedStream { object, uses })
        .collect();
    report
}
