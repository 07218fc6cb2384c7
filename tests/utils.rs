use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// Compress `data` the way producers write FlateDecode payloads.
#[allow(dead_code)]
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).expect("write to encoder");
    encoder.finish().expect("finish zlib stream")
}

/// Assemble a document from `(number, dictionary text, stream payload)`
/// triples. No cross-reference table is written; the linear scan does not
/// need one and real damaged files rarely have a usable one anyway.
#[allow(dead_code)]
pub fn build_document(objects: &[(u32, &str, Option<&[u8]>)]) -> Vec<u8> {
    let mut buf = b"%PDF-1.4\n".to_vec();
    for (number, dict, body) in objects {
        buf.extend_from_slice(format!("{number} 0 obj\n{dict}\n").as_bytes());
        if let Some(body) = body {
            buf.extend_from_slice(b"stream\n");
            buf.extend_from_slice(body);
            buf.extend_from_slice(b"\r\nendstream\n");
        }
        buf.extend_from_slice(b"endobj\n");
    }
    buf.extend_from_slice(b"%%EOF\n");
    buf
}
