//! Console report rendering
//!
//! All diagnostics end up on stdout as plain text. Rendering is kept apart
//! from the analysis so the probes stay thin: they gather data, hand it
//! here, and print the returned string.

use std::fmt::Write;

use crate::{
    capture::CaptureScan,
    continuity::ContinuityReport,
    message::FormatSummary,
    probe::StreamActivity,
    streams,
};

/// Gap lists are truncated in the per-symbol sections; the counts are
/// always complete.
const MAX_GAPS_SHOWN: usize = 5;

// =============================================================================
// CONTINUITY REPORTS
// =============================================================================

/// One symbol's checked sequence, ready for rendering.
#[derive(Debug)]
pub struct SymbolContinuity {
    pub symbol: String,
    pub report: ContinuityReport,
}

/// Render the full capture continuity report: one section per symbol plus
/// an overall summary. Returns true-continuity alongside the text so the
/// caller can set its exit code without re-deriving the verdict.
pub fn render_capture_report(
    source: &str,
    scan: &CaptureScan,
    results: &[SymbolContinuity],
) -> (String, bool) {
    let mut out = String::new();
    let _ = writeln!(out, "=== Depth Continuity Check ===");
    let _ = writeln!(out, "Capture: {source}");
    let _ = writeln!(
        out,
        "Lines: {} read, {} skipped (uninterpretable), {} other events",
        scan.lines_read, scan.lines_skipped, scan.lines_irrelevant
    );
    if !scan.event_counts.is_empty() {
        let breakdown = scan
            .event_counts
            .iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Events: {breakdown}");
    }
    if let Some((first, last)) = scan.time_range() {
        let span_secs = (last - first).num_milliseconds() as f64 / 1000.0;
        let _ = writeln!(out, "Time range: {first} to {last} ({span_secs:.1}s)");
    }
    let _ = writeln!(out);

    for result in results {
        render_symbol_section(&mut out, result);
    }

    let symbols_total = results.len();
    let symbols_with_gaps = results
        .iter()
        .filter(|r| !r.report.is_continuous())
        .count();
    let all_continuous = symbols_with_gaps == 0;

    let _ = writeln!(out, "=== Summary ===");
    let _ = writeln!(out, "Symbols analyzed: {symbols_total}");
    let _ = writeln!(out, "Symbols with gaps: {symbols_with_gaps}");
    let _ = writeln!(
        out,
        "Symbols continuous: {}",
        symbols_total - symbols_with_gaps
    );
    if scan.lines_skipped > 0 {
        let _ = writeln!(
            out,
            "Note: {} lines could not be interpreted and were excluded",
            scan.lines_skipped
        );
    }

    if symbols_total == 0 {
        let _ = writeln!(out, "No depth updates observed - nothing was verified");
    } else if all_continuous {
        let _ = writeln!(out, "✓ All symbols continuous");
    } else {
        let _ = writeln!(out, "✗ {symbols_with_gaps} symbol(s) have depth feed gaps");
    }

    (out, all_continuous)
}

fn render_symbol_section(out: &mut String, result: &SymbolContinuity) {
    let report = &result.report;
    let _ = writeln!(out, "--- {} ---", result.symbol);
    let _ = writeln!(out, "Records checked: {}", report.records_checked);
    if !report.malformed.is_empty() {
        let _ = writeln!(
            out,
            "Malformed records (U > u), excluded: {}",
            report.malformed.len()
        );
    }

    if !report.has_data() {
        let _ = writeln!(out, "  (no data observed)");
    } else if report.is_continuous() {
        let _ = writeln!(out, "  ✓ continuous, no gaps");
    } else {
        let _ = writeln!(
            out,
            "  ✗ {} gap(s), {} update ids missing:",
            report.gaps.len(),
            report.missing_update_ids()
        );
        for gap in report.gaps.iter().take(MAX_GAPS_SHOWN) {
            let _ = writeln!(
                out,
                "     position {}: {} ids missing (prev_u={}, U={})",
                gap.position,
                gap.gap_size,
                gap.previous_last_update_id(),
                gap.observed_first_update_id
            );
        }
        if report.gaps.len() > MAX_GAPS_SHOWN {
            let _ = writeln!(out, "     ... {} more", report.gaps.len() - MAX_GAPS_SHOWN);
        }
    }
    let _ = writeln!(out);
}

// =============================================================================
// SUBSCRIPTION PLAN / STREAM ACTIVITY
// =============================================================================

/// Render the collector's subscription plan: the full URL and the numbered
/// stream list.
pub fn render_subscription_plan(streams: &[String], url: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Collector Subscription ===");
    let _ = writeln!(out, "Streams: {}", streams.len());
    let _ = writeln!(out, "URL length: {}", url.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "{url}");
    let _ = writeln!(out);
    for (i, stream) in streams.iter().enumerate() {
        let _ = writeln!(out, "  {:2}. {stream}", i + 1);
    }
    out
}

/// Render per-symbol, per-stream-type activity collected over a timed
/// window, followed by a configured/active/silent summary.
pub fn render_stream_activity(
    symbols: &[String],
    templates: &[&str],
    activity: &StreamActivity,
) -> (String, bool) {
    let mut out = String::new();
    let _ = writeln!(out, "=== Stream Activity ===");
    let _ = writeln!(
        out,
        "Collected {} messages in {:.1}s",
        activity.total_messages,
        activity.elapsed.as_secs_f64()
    );
    if activity.unenveloped > 0 {
        let _ = writeln!(
            out,
            "  ({} frames without a stream envelope)",
            activity.unenveloped
        );
    }

    let mut configured = 0usize;
    let mut silent = 0usize;

    for symbol in symbols {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}:", symbol.to_uppercase());
        for stream in streams::expand_streams(std::slice::from_ref(symbol), templates) {
            configured += 1;
            let count = activity.count(&stream);
            let mark = if count > 0 {
                "✓"
            } else {
                silent += 1;
                "✗"
            };
            let _ = writeln!(
                out,
                "  {mark} {:<15}: {:5} messages ({:.2}/s)",
                streams::stream_type(&stream),
                count,
                activity.rate(&stream)
            );
        }
    }

    let active = configured - silent;
    let _ = writeln!(out);
    let _ = writeln!(out, "=== Summary ===");
    let _ = writeln!(out, "Configured streams: {configured}");
    let _ = writeln!(out, "Active streams: {active}");
    let _ = writeln!(out, "Silent streams: {silent}");
    let all_active = silent == 0 && configured > 0;
    if all_active {
        let _ = writeln!(out, "✓ All configured streams are delivering data");
    } else {
        let _ = writeln!(out, "✗ {silent} stream(s) produced no data");
    }

    (out, all_active)
}

// =============================================================================
// FORMAT SUMMARIES
// =============================================================================

/// Render one message's field-presence summary.
pub fn render_format_summary(ordinal: usize, summary: &FormatSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Message #{ordinal}: {} bytes", summary.byte_len);
    let _ = writeln!(
        out,
        "  'stream' field: {}{}",
        yes_no(summary.has_stream),
        summary
            .stream
            .as_deref()
            .map(|s| format!(" ({s})"))
            .unwrap_or_default()
    );
    let _ = writeln!(out, "  'data' field:   {}", yes_no(summary.has_data));
    let _ = writeln!(
        out,
        "  payload 's':    {}",
        yes_no(summary.payload_has_symbol)
    );
    let _ = writeln!(
        out,
        "  payload 'e':    {}{}",
        yes_no(summary.payload_has_event_type),
        summary
            .event_type
            .as_deref()
            .map(|e| format!(" ({e})"))
            .unwrap_or_default()
    );
    let _ = writeln!(
        out,
        "  lastUpdateId:   {}",
        yes_no(summary.has_last_update_id)
    );
    if let Some(levels) = summary.bid_levels {
        let _ = writeln!(
            out,
            "  bids: {levels} levels{}",
            summary
                .best_bid
                .as_deref()
                .map(|p| format!(" (best {p})"))
                .unwrap_or_default()
        );
    }
    if let Some(levels) = summary.ask_levels {
        let _ = writeln!(
            out,
            "  asks: {levels} levels{}",
            summary
                .best_ask
                .as_deref()
                .map(|p| format!(" (best {p})"))
                .unwrap_or_default()
        );
    }
    if !summary.payload_fields.is_empty() {
        let _ = writeln!(out, "  payload fields: {}", summary.payload_fields.join(", "));
    }
    out
}

fn yes_no(present: bool) -> &'static str {
    if present {
        "yes"
    } else {
        "no"
    }
}

// =============================================================================
// TESTS
// =============================================================================
