//! Collector capture file reading
//!
//! The collector persists one line per received WebSocket message:
//!
//! ```text
//! <recv-time> {"stream":"btcusdt@depth@100ms","data":{...}}
//! ```
//!
//! Files are plain text or gzip-compressed (dispatch on the `.gz`
//! extension). Scanning filters the capture down to depth-diff events and
//! partitions them per symbol in arrival order, assigning 1-based sequence
//! positions for gap reporting.
//!
//! Lines the scanner cannot interpret are dropped from the record stream
//! but counted, so a clean continuity verdict also discloses how much of
//! the input it ignored. Lines that decode fine but are simply other event
//! types (trades, tickers, depth20 snapshots) are counted as irrelevant,
//! not as damage.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeZone, Utc};
use flate2::read::GzDecoder;
use thiserror::Error;

use crate::{
    continuity::DepthUpdateRecord,
    message::{self, MarketEvent},
};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to open capture file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("i/o error while reading capture")]
    Read(#[from] io::Error),
}

// =============================================================================
// FILE ACCESS
// =============================================================================

/// Open a capture file as a buffered line reader, transparently decoding
/// gzip when the path ends in `.gz`.
pub fn open(path: &Path) -> Result<Box<dyn BufRead>, CaptureError> {
    let file = File::open(path).map_err(|source| CaptureError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

// =============================================================================
// DEPTH-UPDATE SCAN
// =============================================================================

/// Everything a scan extracted from one capture.
#[derive(Debug, Default)]
pub struct CaptureScan {
    /// Lines consumed (bounded by `max_lines`)
    pub lines_read: u64,
    /// Lines that should have been interpretable but were not: no
    /// timestamp/json split, broken JSON, or a depthUpdate with required
    /// fields missing
    pub lines_skipped: u64,
    /// Well-formed lines carrying something other than a depth diff
    pub lines_irrelevant: u64,
    /// Receive time of the earliest line with a parseable timestamp
    pub first_recv_time: Option<DateTime<Utc>>,
    /// Receive time of the latest line with a parseable timestamp
    pub last_recv_time: Option<DateTime<Utc>>,
    /// Classified events by kind (depthUpdate, trade, bookTicker, ...)
    pub event_counts: BTreeMap<&'static str, u64>,
    /// Depth-diff records extracted, per symbol, in arrival order
    pub per_symbol: BTreeMap<String, Vec<DepthUpdateRecord>>,
}

impl CaptureScan {
    pub fn total_depth_records(&self) -> u64 {
        self.per_symbol.values().map(|v| v.len() as u64).sum()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &String> {
        self.per_symbol.keys()
    }

    /// Wall-clock span of the capture, when timestamps were parseable.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.first_recv_time?, self.last_recv_time?))
    }
}

/// Scan a capture file for depth-diff events. Convenience wrapper over
/// [`open`] + [`scan_depth_updates`]; reopening the file restarts the scan
/// from the beginning.
pub fn scan_file(path: &Path, max_lines: Option<u64>) -> Result<CaptureScan, CaptureError> {
    let reader = open(path)?;
    scan_depth_updates(reader, max_lines)
}

/// Scan capture lines for depth-diff events, stopping after `max_lines`
/// if given.
pub fn scan_depth_updates<R: BufRead>(
    reader: R,
    max_lines: Option<u64>,
) -> Result<CaptureScan, CaptureError> {
    let mut scan = CaptureScan::default();

    for line in reader.lines() {
        if max_lines.is_some_and(|max| scan.lines_read >= max) {
            break;
        }
        let line = line?;
        scan.lines_read += 1;
        ingest_line(&mut scan, &line);
    }

    Ok(scan)
}

fn ingest_line(scan: &mut CaptureScan, line: &str) {
    // Layout: "<recv-time> <json>"
    let Some((recv_time, json)) = line.trim_end().split_once(' ') else {
        scan.lines_skipped += 1;
        return;
    };

    if let Some(t) = parse_recv_time(recv_time) {
        scan.first_recv_time.get_or_insert(t);
        scan.last_recv_time = Some(t);
    }

    let Some(msg) = message::parse_combined(json) else {
        scan.lines_skipped += 1;
        return;
    };

    match message::classify(&msg.data) {
        // Only depth streams can carry diff events; a diff-shaped payload
        // anywhere else is not continuity-checkable
        Some(MarketEvent::DepthDiff(ev)) if msg.stream.contains("depth") => {
            *scan.event_counts.entry("depthUpdate").or_insert(0) += 1;
            let records = scan.per_symbol.entry(ev.symbol.clone()).or_default();
            records.push(DepthUpdateRecord {
                symbol: ev.symbol,
                first_update_id: ev.first_update_id,
                last_update_id: ev.last_update_id,
                sequence_position: records.len() as u64 + 1,
            });
        }
        // Trades, tickers and depth20 snapshots: counted, not checked
        Some(event) => {
            *scan.event_counts.entry(event.kind()).or_insert(0) += 1;
            scan.lines_irrelevant += 1;
        }
        None => {
            let claims_depth_update = msg
                .data
                .get("e")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|e| e == "depthUpdate");
            if claims_depth_update {
                // Said it was a diff but lacked the required fields
                scan.lines_skipped += 1;
            } else {
                scan.lines_irrelevant += 1;
            }
        }
    }
}

/// The collector's writer stamps each line with the receive time; accept
/// RFC 3339 or epoch milliseconds.
fn parse_recv_time(token: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(token) {
        return Some(t.with_timezone(&Utc));
    }
    let millis: i64 = token.parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use flate2::{write::GzEncoder, Compression};

    use super::*;

    fn diff_line(symbol: &str, first: i64, last: i64) -> String {
        let lower = symbol.to_lowercase();
        format!(
            r#"1700000000000 {{"stream":"{lower}@depth@100ms","data":{{"e":"depthUpdate","E":1700000000123,"s":"{symbol}","U":{first},"u":{last},"b":[],"a":[]}}}}"#
        )
    }

    fn sample_capture() -> String {
        [
            diff_line("BTCUSDT", 100, 200),
            // depth20 snapshot: depth stream, but not a diff -> irrelevant
            r#"1700000000100 {"stream":"btcusdt@depth20@100ms","data":{"lastUpdateId":200,"bids":[["1.0","2.0"]],"asks":[["1.1","2.0"]]}}"#.to_string(),
            // trade on a non-depth stream -> irrelevant
            r#"1700000000200 {"stream":"btcusdt@trade","data":{"e":"trade","E":1,"s":"BTCUSDT","t":1,"p":"1.0","q":"2.0","m":false}}"#.to_string(),
            diff_line("ETHUSDT", 50, 80),
            // claims depthUpdate but lacks U -> skipped
            r#"1700000000300 {"stream":"btcusdt@depth@100ms","data":{"e":"depthUpdate","s":"BTCUSDT","u":250}}"#.to_string(),
            // broken JSON -> skipped
            "1700000000400 {not json".to_string(),
            // no space separator -> skipped
            "lonetoken".to_string(),
            diff_line("BTCUSDT", 201, 300),
        ]
        .join("\n")
    }

    #[test]
    fn test_scan_partitions_per_symbol_in_arrival_order() {
        let scan = scan_depth_updates(Cursor::new(sample_capture()), None).unwrap();

        assert_eq!(scan.lines_read, 8);
        assert_eq!(scan.lines_skipped, 3);
        assert_eq!(scan.lines_irrelevant, 2);
        assert_eq!(scan.total_depth_records(), 3);
        assert_eq!(scan.event_counts.get("depthUpdate"), Some(&3));
        assert_eq!(scan.event_counts.get("partialBook"), Some(&1));
        assert_eq!(scan.event_counts.get("trade"), Some(&1));

        let btc = &scan.per_symbol["BTCUSDT"];
        assert_eq!(btc.len(), 2);
        assert_eq!(
            (btc[0].first_update_id, btc[0].last_update_id, btc[0].sequence_position),
            (100, 200, 1)
        );
        assert_eq!(
            (btc[1].first_update_id, btc[1].last_update_id, btc[1].sequence_position),
            (201, 300, 2)
        );

        let eth = &scan.per_symbol["ETHUSDT"];
        assert_eq!(eth.len(), 1);
        assert_eq!(eth[0].sequence_position, 1);
    }

    #[test]
    fn test_scan_respects_max_lines() {
        let scan = scan_depth_updates(Cursor::new(sample_capture()), Some(1)).unwrap();
        assert_eq!(scan.lines_read, 1);
        assert_eq!(scan.total_depth_records(), 1);
    }

    #[test]
    fn test_scan_empty_input() {
        let scan = scan_depth_updates(Cursor::new(String::new()), None).unwrap();
        assert_eq!(scan.lines_read, 0);
        assert!(scan.per_symbol.is_empty());
    }

    #[test]
    fn test_open_plain_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        std::fs::write(&path, sample_capture()).unwrap();

        let scan = scan_file(&path, None).unwrap();
        assert_eq!(scan.total_depth_records(), 3);
    }

    #[test]
    fn test_open_gzipped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.gz");

        let file = File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(sample_capture().as_bytes()).unwrap();
        encoder.finish().unwrap();

        let scan = scan_file(&path, None).unwrap();
        assert_eq!(scan.total_depth_records(), 3);
        assert_eq!(scan.lines_skipped, 3);
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = scan_file(Path::new("/nonexistent/capture.gz"), None).unwrap_err();
        assert!(matches!(err, CaptureError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/capture.gz"));
    }

    #[test]
    fn test_recv_time_range_from_epoch_millis() {
        let capture = format!(
            "{}\n{}",
            diff_line("BTCUSDT", 100, 200),
            diff_line("BTCUSDT", 201, 300).replacen("1700000000000", "1700000005000", 1),
        );
        let scan = scan_depth_updates(Cursor::new(capture), None).unwrap();
        let (first, last) = scan.time_range().unwrap();
        assert_eq!(first.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(last.timestamp_millis(), 1_700_000_005_000);
    }

    #[test]
    fn test_recv_time_accepts_rfc3339() {
        let line = diff_line("BTCUSDT", 100, 200).replacen(
            "1700000000000",
            "2025-10-17T00:00:00Z",
            1,
        );
        let scan = scan_depth_updates(Cursor::new(line), None).unwrap();
        assert!(scan.time_range().is_some());
        assert_eq!(scan.total_depth_records(), 1);
    }

    #[test]
    fn test_unparseable_recv_time_still_yields_records() {
        let line = diff_line("BTCUSDT", 100, 200).replacen("1700000000000", "when?", 1);
        let scan = scan_depth_updates(Cursor::new(line), None).unwrap();
        assert!(scan.time_range().is_none());
        assert_eq!(scan.total_depth_records(), 1);
    }

    #[test]
    fn test_rescan_restarts_from_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.txt");
        std::fs::write(&path, sample_capture()).unwrap();

        let first = scan_file(&path, None).unwrap();
        let second = scan_file(&path, None).unwrap();
        assert_eq!(first.total_depth_records(), second.total_depth_records());
        assert_eq!(first.lines_read, second.lines_read);
    }
}
