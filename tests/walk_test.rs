use pdfprobe::{
    inspect, list_contents, search_streams, smask_graph, stream_stats, walk_pages, ContentStatus,
    Document, Error, Result, MIN_ASCII_RUN,
};

mod utils;

fn needles(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// A small document with a watermark stream shared between two pages.
fn watermarked_document() -> Document {
    let watermark = utils::deflate(b"BT (CONFIDENTIAL DRAFT) Tj ET");
    let fill = utils::deflate(b"0.5 0.5 0.5 rg");
    Document::from_bytes(utils::build_document(&[
        (1, "<< /Type /Catalog /Pages 2 0 R >>", None),
        (2, "<< /Type /Pages /Kids [3 0 R 5 0 R] /Count 2 >>", None),
        (3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>", None),
        (4, "<< /Filter /FlateDecode >>", Some(&watermark)),
        (5, "<< /Type /Page /Parent 2 0 R /Contents [4 0 R 9 0 R] >>", None),
        // Deflated but with no /Filter entry, as hand-built documents do it.
        (9, "<< /Length 14 >>", Some(&fill)),
    ]))
}

#[test]
fn page_walk_finds_the_watermark_on_both_pages() {
    let doc = watermarked_document();
    let walk = walk_pages(&doc, &needles(&["CONFIDENTIAL DRAFT"]));

    assert!(walk.errors.is_empty());
    // The /Pages tree node and the catalog are not pages.
    assert_eq!(walk.pages.len(), 2);

    let first = &walk.pages[0];
    assert_eq!(first.page, 3);
    assert_eq!(first.contents, vec![4]);
    match &first.streams[0].status {
        ContentStatus::Matched(matches) => {
            assert_eq!(matches.len(), 1);
            assert_eq!(matches[0].offset, 4);
            assert_eq!(matches[0].context, "BT (CONFIDENTIAL DRAFT) Tj ET");
        }
        other => panic!("expected a match, got {other:?}"),
    }

    let second = &walk.pages[1];
    assert_eq!(second.page, 5);
    assert_eq!(second.contents, vec![4, 9]);
    assert!(matches!(second.streams[0].status, ContentStatus::Matched(_)));
    assert!(matches!(second.streams[1].status, ContentStatus::Clean));
}

#[test]
fn dangling_and_streamless_contents_are_missing() {
    let doc = Document::from_bytes(utils::build_document(&[
        (3, "<< /Type /Page /Contents [99 0 R 5 0 R] >>", None),
        (5, "<< /Type /Annot >>", None),
    ]));
    let walk = walk_pages(&doc, &needles(&["anything"]));
    let page = &walk.pages[0];
    assert!(matches!(page.streams[0].status, ContentStatus::Missing));
    assert!(matches!(page.streams[1].status, ContentStatus::Missing));
}

#[test]
fn undecodable_content_stream_is_failed_not_fatal() {
    let doc = Document::from_bytes(utils::build_document(&[
        (3, "<< /Type /Page /Contents 4 0 R >>", None),
        (4, "<< /Filter /FlateDecode >>", Some(b"this is not zlib data")),
    ]));
    let walk = walk_pages(&doc, &needles(&["anything"]));
    match &walk.pages[0].streams[0].status {
        ContentStatus::Failed(reason) => assert!(reason.contains("corrupt stream data")),
        other => panic!("expected a decode failure, got {other:?}"),
    }
}

#[test]
fn contents_of_unexpected_shape_is_reported() {
    let doc = Document::from_bytes(utils::build_document(&[(
        3,
        "<< /Type /Page /Contents (inline) >>",
        None,
    )]));
    let walk = walk_pages(&doc, &needles(&[]));
    let page = &walk.pages[0];
    assert!(page.contents.is_empty());
    let reason = page.contents_error.as_deref().unwrap();
    assert!(reason.contains("reference or array of references"));
}

#[test]
fn contents_listing_flags_the_shared_stream() {
    let doc = watermarked_document();
    let report = list_contents(&doc);

    assert!(report.errors.is_empty());
    assert_eq!(report.pages.len(), 2);
    assert_eq!(report.pages[0].contents, vec![4]);
    assert_eq!(report.pages[1].contents, vec![4, 9]);

    assert_eq!(report.shared.len(), 1);
    assert_eq!(report.shared[0].object, 4);
    assert_eq!(report.shared[0].uses, 2);
}

#[test]
fn smask_graph_lists_edges_and_unresolved_entries() {
    let doc = Document::from_bytes(utils::build_document(&[
        (7, "<< /Type /XObject /Subtype /Image /SMask 8 0 R >>", Some(b"IMG")),
        (8, "<< /Type /XObject /Subtype /Image >>", Some(b"MASK")),
        (12, "<< /Type /ExtGState /SMask /None >>", None),
        (13, "<< /Type /XObject /Subtype /Image /SMask 8 0 R >>", Some(b"IMG2")),
    ]));
    let report = smask_graph(&doc);

    // A mask referenced twice shows up as one edge per referrer.
    let edges: Vec<(u32, u32)> = report.edges.iter().map(|e| (e.object, e.smask)).collect();
    assert_eq!(edges, vec![(7, 8), (13, 8)]);
    assert_eq!(report.unresolved, vec![12]);
}

#[test]
fn smask_inside_a_nested_dictionary_is_not_skipped() {
    let doc = Document::from_bytes(utils::build_document(&[
        (4, "<< /Type /ExtGState /G << /SMask 8 0 R >> >>", None),
        (5, "<< /Group [ << /SMask 8 0 R >> ] >>", None),
        (8, "<< /Type /XObject /Subtype /Image >>", Some(b"MASK")),
    ]));
    let report = smask_graph(&doc);

    // Only a top-level direct reference makes an edge.
    assert!(report.edges.is_empty());
    assert_eq!(report.unresolved, vec![4, 5]);
}

#[test]
fn stream_sweep_reports_hits_and_errors_separately() {
    let watermark = utils::deflate(b"BT (CONFIDENTIAL DRAFT) Tj ET");
    let doc = Document::from_bytes(utils::build_document(&[
        (2, "<< /Type /Catalog >>", None),
        (4, "<< /Filter /FlateDecode >>", Some(&watermark)),
        (6, "<< /Filter /LZWDecode >>", Some(b"\x80\x0b\x60")),
        (9, "<< /Length 30 >>", Some(b"plain text with TRACKER inside")),
    ]));
    let report = search_streams(&doc, &needles(&["CONFIDENTIAL", "TRACKER"]));

    // Object 2 has no stream and object 6 fails to decode.
    assert_eq!(report.scanned, 2);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("object 6"));
    assert!(report.errors[0].contains("unsupported stream filter /LZWDecode"));

    assert_eq!(report.hits.len(), 2);
    assert_eq!(report.hits[0].object, 4);
    assert_eq!(report.hits[0].kind, "filtered");
    assert_eq!(report.hits[1].object, 9);
    assert_eq!(report.hits[1].kind, "raw");
    assert_eq!(report.hits[1].matches[0].needle, "TRACKER");
}

#[test]
fn undeclared_zlib_stream_is_inflated_for_search() {
    let doc = Document::from_bytes(utils::build_document(&[(
        9,
        "<< /Length 22 >>",
        Some(&utils::deflate(b"watermark W123 payload")),
    )]));
    let report = search_streams(&doc, &needles(&["W123"]));
    assert_eq!(report.hits.len(), 1);
    assert_eq!(report.hits[0].kind, "inflated");
    assert_eq!(report.hits[0].matches[0].offset, 10);
}

#[test]
fn inspect_summarises_dictionary_and_stream() -> Result<()> {
    let payload = utils::deflate(b"BT (X) Tj ET");
    let doc = Document::from_bytes(utils::build_document(&[(
        7,
        "<< /Filter /FlateDecode /Length 999 >>",
        Some(&payload),
    )]));

    let summary = inspect(&doc, 7, true)?;
    assert_eq!(summary.object, 7);
    assert_eq!(summary.generation, 0);
    // The header sits right after the %PDF-1.4 line.
    assert_eq!(summary.offset, 9);
    assert_eq!(summary.dictionary, "<< /Filter /FlateDecode /Length 999 >>");

    let stream = summary.stream.unwrap();
    assert_eq!(stream.raw_len, payload.len());
    assert!(stream.decode_error.is_none());
    let decoded = stream.decoded.unwrap();
    assert_eq!(decoded.len, 12);
    assert_eq!(decoded.kind, "filtered");
    assert_eq!(decoded.preview, "42 54 20 28 58 29 20 54 6a 20 45 54");
    Ok(())
}

#[test]
fn inspect_without_decoding_leaves_the_stream_raw() -> Result<()> {
    let doc = Document::from_bytes(utils::build_document(&[(
        4,
        "<< /Filter /FlateDecode >>",
        Some(b"not zlib"),
    )]));
    let summary = inspect(&doc, 4, false)?;
    let stream = summary.stream.unwrap();
    assert!(stream.decoded.is_none());
    assert!(stream.decode_error.is_none());
    Ok(())
}

#[test]
fn inspect_of_an_absent_object_fails() {
    let doc = Document::from_bytes(utils::build_document(&[(1, "<< >>", None)]));
    assert!(matches!(inspect(&doc, 99, false), Err(Error::ObjectNotFound(99))));
}

#[test]
fn stats_surface_readable_text_inside_binary_data() -> Result<()> {
    let mut body = Vec::new();
    for _ in 0..30 {
        body.extend_from_slice(&[0x00, 0xff]);
    }
    body.extend_from_slice(b"HIDDEN WATERMARK TEXT");
    body.extend_from_slice(&[0x01; 10]);

    let doc = Document::from_bytes(utils::build_document(&[(8, "<< /Length 91 >>", Some(&body))]));
    let stats = stream_stats(&doc, 8, MIN_ASCII_RUN)?.unwrap();

    assert_eq!(stats.object, 8);
    assert_eq!(stats.raw_len, 91);
    // Not zlib, so the searchable bytes are the raw bytes themselves.
    assert_eq!(stats.decoded_len, Some(91));
    assert!(stats.decode_error.is_none());
    assert!(stats.entropy > 0.0 && stats.entropy < 8.0);
    assert_eq!(stats.distinct_leading_bytes, 16);

    assert_eq!(stats.ascii_runs.len(), 1);
    assert_eq!(stats.ascii_runs[0].offset, 60);
    assert_eq!(stats.ascii_runs[0].len, 21);
    assert_eq!(stats.ascii_runs[0].text, "HIDDEN WATERMARK TEXT");
    Ok(())
}

#[test]
fn stats_are_taken_over_the_decoded_stream() -> Result<()> {
    let mut payload = vec![0x02; 20];
    payload.extend_from_slice(b"INVOICE WATERMARK 77");
    payload.extend_from_slice(&[0x03; 5]);
    let compressed = utils::deflate(&payload);

    let doc = Document::from_bytes(utils::build_document(&[(
        6,
        "<< /Filter /FlateDecode >>",
        Some(&compressed),
    )]));
    let stats = stream_stats(&doc, 6, MIN_ASCII_RUN)?.unwrap();

    assert_eq!(stats.raw_len, compressed.len());
    assert_eq!(stats.decoded_len, Some(45));
    // Run offsets are positions in the decoded bytes.
    assert_eq!(stats.ascii_runs.len(), 1);
    assert_eq!(stats.ascii_runs[0].offset, 20);
    assert_eq!(stats.ascii_runs[0].text, "INVOICE WATERMARK 77");
    Ok(())
}

#[test]
fn stats_of_a_streamless_object_is_none() -> Result<()> {
    let doc = Document::from_bytes(utils::build_document(&[(1, "<< /Type /Catalog >>", None)]));
    assert!(stream_stats(&doc, 1, MIN_ASCII_RUN)?.is_none());
    Ok(())
}
