//! Integration tests for capture continuity analysis
//!
//! Builds synthetic collector captures (the `<recv-time> <json>` line
//! format, gzipped and plain) and runs the full scan -> check -> report
//! pipeline over them.

use std::{fs::File, io::Write, path::PathBuf};

use flate2::{write::GzEncoder, Compression};

use depthwatch::{
    capture, continuity,
    report::{self, SymbolContinuity},
};

fn diff_line(recv_ms: u64, symbol: &str, first: i64, last: i64) -> String {
    let stream = format!("{}@depth@100ms", symbol.to_lowercase());
    format!(
        r#"{recv_ms} {{"stream":"{stream}","data":{{"e":"depthUpdate","E":{recv_ms},"s":"{symbol}","U":{first},"u":{last},"b":[["50000.00","1.0"]],"a":[["50001.00","1.0"]]}}}}"#
    )
}

fn trade_line(recv_ms: u64, symbol: &str) -> String {
    let stream = format!("{}@trade", symbol.to_lowercase());
    format!(
        r#"{recv_ms} {{"stream":"{stream}","data":{{"e":"trade","E":{recv_ms},"s":"{symbol}","t":1,"p":"50000.50","q":"0.01","m":true}}}}"#
    )
}

fn book_ticker_line(recv_ms: u64, symbol: &str) -> String {
    let stream = format!("{}@bookTicker", symbol.to_lowercase());
    format!(
        r#"{recv_ms} {{"stream":"{stream}","data":{{"u":400900217,"s":"{symbol}","b":"50000.00","B":"1.0","a":"50001.00","A":"2.0"}}}}"#
    )
}

fn depth20_line(recv_ms: u64, symbol: &str, last_update_id: i64) -> String {
    let stream = format!("{}@depth20@100ms", symbol.to_lowercase());
    format!(
        r#"{recv_ms} {{"stream":"{stream}","data":{{"lastUpdateId":{last_update_id},"bids":[["50000.00","1.0"]],"asks":[["50001.00","1.0"]]}}}}"#
    )
}

/// A capture interleaving three symbols with the other stream types the
/// collector records, plus damage: a malformed diff and a broken line.
fn mixed_capture() -> String {
    [
        diff_line(1000, "BTCUSDT", 100, 200),
        trade_line(1001, "BTCUSDT"),
        diff_line(1002, "ETHUSDT", 500, 600),
        book_ticker_line(1003, "BTCUSDT"),
        depth20_line(1003, "BTCUSDT", 200),
        // overlap: continuous by the spot rule
        diff_line(1004, "BTCUSDT", 150, 250),
        // inverted bounds: malformed, excluded from the fold
        diff_line(1005, "BTCUSDT", 400, 300),
        // gap for ETHUSDT: expected 601, observed 605
        diff_line(1006, "ETHUSDT", 605, 700),
        "garbage-line-without-json".to_string(),
        // attaches to u=250, as if the malformed record were absent
        diff_line(1007, "BTCUSDT", 251, 320),
        diff_line(1008, "SOLUSDT", 42, 42),
    ]
    .join("\n")
}

fn write_gzipped(path: &PathBuf, content: &str) {
    let file = File::create(path).expect("create capture");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(content.as_bytes()).expect("write capture");
    encoder.finish().expect("finish gzip");
}

#[test]
fn gzipped_capture_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("btcusdt_20251017.gz");
    write_gzipped(&path, &mixed_capture());

    let scan = capture::scan_file(&path, None).expect("scan");

    assert_eq!(scan.lines_read, 11);
    assert_eq!(scan.lines_skipped, 1); // the garbage line
    assert_eq!(scan.lines_irrelevant, 3); // trade + bookTicker + depth20 snapshot
    assert_eq!(scan.total_depth_records(), 7);
    assert_eq!(scan.event_counts.get("depthUpdate"), Some(&7));
    assert_eq!(scan.event_counts.get("trade"), Some(&1));
    assert_eq!(scan.event_counts.get("bookTicker"), Some(&1));
    assert_eq!(scan.event_counts.get("partialBook"), Some(&1));
    assert_eq!(
        scan.symbols().map(String::as_str).collect::<Vec<_>>(),
        vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]
    );

    let results: Vec<SymbolContinuity> = scan
        .per_symbol
        .iter()
        .map(|(symbol, records)| SymbolContinuity {
            symbol: symbol.clone(),
            report: continuity::check(records.iter().cloned()),
        })
        .collect();

    // BTCUSDT: overlap accepted, malformed excluded, next record attaches
    let btc = &results[0].report;
    assert!(btc.is_continuous());
    assert_eq!(btc.records_checked, 3);
    assert_eq!(btc.malformed.len(), 1);
    assert_eq!(btc.malformed[0].position, 3);

    // ETHUSDT: one gap of 4 ids
    let eth = &results[1].report;
    assert!(!eth.is_continuous());
    assert_eq!(eth.gaps.len(), 1);
    assert_eq!(eth.gaps[0].gap_size, 4);
    assert_eq!(eth.gaps[0].expected_upper_bound, 601);
    assert_eq!(eth.gaps[0].observed_first_update_id, 605);

    // SOLUSDT: single record, vacuously continuous
    let sol = &results[2].report;
    assert!(sol.is_continuous());
    assert_eq!(sol.records_checked, 1);

    let (text, all_continuous) =
        report::render_capture_report(&path.display().to_string(), &scan, &results);
    assert!(!all_continuous);
    assert!(text.contains("--- BTCUSDT ---"));
    assert!(text.contains("Malformed records (U > u), excluded: 1"));
    assert!(text.contains("--- ETHUSDT ---"));
    assert!(text.contains("position 2: 4 ids missing (prev_u=600, U=605)"));
    assert!(text.contains("Symbols with gaps: 1"));
    assert!(text.contains("Symbols continuous: 2"));
}

#[test]
fn plain_capture_matches_gzipped_results() {
    let dir = tempfile::tempdir().expect("tempdir");
    let plain = dir.path().join("capture.txt");
    let gzipped = dir.path().join("capture.gz");

    std::fs::write(&plain, mixed_capture()).expect("write plain");
    write_gzipped(&gzipped, &mixed_capture());

    let plain_scan = capture::scan_file(&plain, None).expect("scan plain");
    let gz_scan = capture::scan_file(&gzipped, None).expect("scan gz");

    assert_eq!(plain_scan.per_symbol, gz_scan.per_symbol);
    assert_eq!(plain_scan.lines_skipped, gz_scan.lines_skipped);
}

#[test]
fn max_lines_bounds_the_scan() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("capture.txt");
    std::fs::write(&path, mixed_capture()).expect("write");

    let scan = capture::scan_file(&path, Some(3)).expect("scan");
    assert_eq!(scan.lines_read, 3);
    // first three lines: BTC diff, BTC trade, ETH diff
    assert_eq!(scan.total_depth_records(), 2);
}

#[test]
fn empty_capture_reports_no_data_observed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("empty.txt");
    std::fs::write(&path, "").expect("write");

    let scan = capture::scan_file(&path, None).expect("scan");
    let (text, all_continuous) = report::render_capture_report("empty.txt", &scan, &[]);

    // Vacuously continuous, but explicitly not a verification
    assert!(all_continuous);
    assert!(text.contains("No depth updates observed"));
}
