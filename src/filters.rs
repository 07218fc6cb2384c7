//! Flate-only stream decoding.

use crate::{Dictionary, Error, Result};
use flate2::read::ZlibDecoder;
use log::debug;
use std::io::Read;

/// The declared filter pipeline of one stream, in decoding order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    names: Vec<String>,
}

impl FilterChain {
    /// The pipeline of a dictionary without `/Filter`: identity.
    pub fn empty() -> FilterChain {
        FilterChain::default()
    }

    /// A single Flate stage, for callers that sniff compression where no
    /// filter is declared.
    pub fn flate() -> FilterChain {
        FilterChain {
            names: vec!["FlateDecode".into()],
        }
    }

    /// Read the `/Filter` entry of a stream dictionary.
    ///
    /// An absent entry yields the identity pipeline. A name yields one
    /// stage and an array of names one stage per member; every other shape
    /// is a type error.
    pub fn from_dict(dict: &Dictionary) -> Result<FilterChain> {
        if !dict.has(b"Filter") {
            return Ok(FilterChain::empty());
        }
        let filter = dict.get(b"Filter")?;

        if let Ok(name) = filter.as_name() {
            return Ok(FilterChain {
                names: vec![String::from_utf8_lossy(name).into_owned()],
            });
        }
        if let Ok(members) = filter.as_array() {
            let names: Vec<String> = members
                .iter()
                .filter_map(|member| member.as_name().ok())
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .collect();
            // It is an error if any single member is not a name.
            if names.len() == members.len() {
                return Ok(FilterChain { names });
            }
        }
        Err(Error::ValueType {
            expected: "name or array of names",
            found: filter.enum_variant(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_identity(&self) -> bool {
        self.names.is_empty()
    }
}

/// Run the declared pipeline over raw stream bytes.
///
/// Any stage other than `FlateDecode` aborts the decode before any data is
/// touched. The identity pipeline returns the input unchanged.
pub fn decode(data: &[u8], chain: &FilterChain) -> Result<Vec<u8>> {
    for name in chain.names() {
        if name != "FlateDecode" {
            return Err(Error::UnsupportedFilter(name.clone()));
        }
    }
    let mut output = data.to_vec();
    for _ in chain.names() {
        output = inflate(&output)?;
    }
    Ok(output)
}

/// Inflate one zlib layer.
///
/// A failed attempt is retried once with ASCII whitespace trimmed from both
/// ends, which recovers streams whose framing bytes crept into the payload.
/// When both attempts fail, the retry's error is the one reported.
fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    match inflate_raw(data) {
        Ok(output) => Ok(output),
        Err(first) => {
            let trimmed = data.trim_ascii();
            if trimmed.len() == data.len() {
                return Err(Error::CorruptData(first));
            }
            debug!(
                "inflate failed ({first}), retrying with {} framing bytes trimmed",
                data.len() - trimmed.len()
            );
            inflate_raw(trimmed).map_err(Error::CorruptData)
        }
    }
}

fn inflate_raw(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut decoder = ZlibDecoder::new(input);
    decoder.read_to_end(&mut output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_dictionary;

    fn deflate(data: &[u8]) -> Vec<u8> {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn flate_roundtrip() {
        let plain = b"BT /F1 12 Tf (CONFIDENTIAL) Tj ET";
        let decoded = decode(&deflate(plain), &FilterChain::flate()).unwrap();
        assert_eq!(decoded, plain);
    }

    #[test]
    fn identity_chain_returns_input() {
        let chain = FilterChain::empty();
        assert_eq!(decode(b"raw bytes", &chain).unwrap(), b"raw bytes");
    }

    #[test]
    fn double_flate_chain_runs_both_stages() {
        let plain = b"q 612 0 0 792 0 0 cm /Im1 Do Q";
        let twice = deflate(&deflate(plain));
        let dict = parse_dictionary(b"<< /Filter [/FlateDecode /FlateDecode] >>").unwrap();
        let chain = FilterChain::from_dict(&dict).unwrap();
        assert_eq!(chain.names().len(), 2);
        assert_eq!(decode(&twice, &chain).unwrap(), plain);
    }

    #[test]
    fn retry_strips_leading_framing() {
        let plain = b"0.5 0.5 0.5 rg";
        let mut data = b"\r\n".to_vec();
        data.extend_from_slice(&deflate(plain));
        assert_eq!(decode(&data, &FilterChain::flate()).unwrap(), plain);
    }

    #[test]
    fn trailing_newline_is_harmless() {
        let plain = b"BT (Hello) Tj ET";
        let mut data = deflate(plain);
        data.push(b'\n');
        assert_eq!(decode(&data, &FilterChain::flate()).unwrap(), plain);
    }

    #[test]
    fn corrupt_data_is_reported() {
        assert!(matches!(
            decode(b"not-a-zlib-stream", &FilterChain::flate()),
            Err(Error::CorruptData(_))
        ));
        // Whitespace at the edges triggers the retry; the result is the same.
        assert!(matches!(
            decode(b"  still not zlib  ", &FilterChain::flate()),
            Err(Error::CorruptData(_))
        ));
    }

    #[test]
    fn unsupported_filter_is_named() {
        let dict = parse_dictionary(b"<< /Filter /LZWDecode >>").unwrap();
        let chain = FilterChain::from_dict(&dict).unwrap();
        match decode(b"anything", &chain) {
            Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "LZWDecode"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unsupported_stage_stops_the_whole_chain() {
        let dict = parse_dictionary(b"<< /Filter [/FlateDecode /Crypt] >>").unwrap();
        let chain = FilterChain::from_dict(&dict).unwrap();
        assert!(matches!(
            decode(&deflate(b"data"), &chain),
            Err(Error::UnsupportedFilter(_))
        ));
    }

    #[test]
    fn missing_filter_is_identity() {
        let dict = parse_dictionary(b"<< /Length 10 >>").unwrap();
        assert!(FilterChain::from_dict(&dict).unwrap().is_identity());
    }

    #[test]
    fn non_name_filter_is_a_type_error() {
        let dict = parse_dictionary(b"<< /Filter 42 >>").unwrap();
        assert!(matches!(
            FilterChain::from_dict(&dict),
            Err(Error::ValueType { expected: "name or array of names", found: "integer" })
        ));
    }
}
