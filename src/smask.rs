//! Soft-mask graph: which objects point at which `/SMask` targets.
//!
//! Transparency soft masks are a favourite place to hide watermark payloads,
//! because the mask object is only reachable through the image that uses it.
//! The graph lists every edge so unreferenced or odd-shaped masks stand out.

use crate::{Document, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmaskReport {
    pub edges: Vec<SmaskEdge>,
    /// Objects whose `/SMask` is present but not a direct top-level
    /// reference: an inline dictionary, a name such as `/None`, or an
    /// `/SMask` key buried inside a nested dictionary or array.
    pub unresolved: Vec<u32>,
    pub errors: Vec<String>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SmaskEdge {
    pub object: u32,
    pub smask: u32,
}

/// Collect every `/SMask` edge in the document.
pub fn smask_graph(doc: &Document) -> SmaskReport {
    let mut report = SmaskReport::default();
    for record in doc.objects() {
        let dict = match doc.dictionary(&record) {
            Ok(dict) => dict,
            Err(err) => {
                report.errors.push(format!("object {}: {err}", record.number()));
                continue;
            }
        };
        if dict.has(b"SMask") {
            match dict.get(b"SMask").and_then(Value::as_reference) {
                Ok((smask, _)) => report.edges.push(SmaskEdge {
                    object: record.number(),
                    smask,
                }),
                Err(_) => report.unresolved.push(record.number()),
            }
        } else if dict.iter().any(|(_, value)| holds_smask(value)) {
            report.unresolved.push(record.number());
        }
    }
    report
}

/// True when an `/SMask` key appears anywhere inside `value`.
fn holds_smask(value: &Value) -> bool {
    match value {
        Value::Dictionary(dict) => {
            dict.has(b"SMask") || dict.iter().any(|(_, inner)| holds_smask(inner))
        }
        Value::Array(items) => items.iter().any(holds_smask),
        _ => false,
    }
}
