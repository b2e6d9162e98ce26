//! Stream-name expansion and WebSocket URL construction
//!
//! Replicates the collector's subscription URL generation exactly, so the
//! probes exercise the same URL the collector connects with: `$symbol` in
//! each template is substituted with the lowercased symbol, per-symbol
//! streams are emitted in template order, and the combined endpoint joins
//! all names with `/`.

/// Binance spot WebSocket base endpoint.
pub const BINANCE_SPOT_WS: &str = "wss://stream.binance.com:9443";

/// The collector's spot stream templates, in subscription order.
pub const SPOT_STREAM_TEMPLATES: &[&str] = &[
    "$symbol@trade",
    "$symbol@bookTicker",
    "$symbol@depth@100ms",
    "$symbol@depth20@100ms",
];

/// Expand stream templates over a symbol list, collector-style: all of one
/// symbol's streams before the next symbol's.
pub fn expand_streams(symbols: &[String], templates: &[&str]) -> Vec<String> {
    let mut streams = Vec::with_capacity(symbols.len() * templates.len());
    for symbol in symbols {
        let lower = symbol.to_lowercase();
        for template in templates {
            streams.push(template.replace("$symbol", &lower));
        }
    }
    streams
}

/// Combined (multi-stream) endpoint URL:
/// `wss://stream.binance.com:9443/stream?streams=a/b/c`
pub fn combined_url(streams: &[String]) -> String {
    format!("{BINANCE_SPOT_WS}/stream?streams={}", streams.join("/"))
}

/// Raw (single-stream) endpoint URL: `wss://stream.binance.com:9443/ws/<stream>`
pub fn raw_url(stream: &str) -> String {
    format!("{BINANCE_SPOT_WS}/ws/{stream}")
}

/// The stream-type label of a full stream name:
/// `"btcusdt@depth20@100ms"` -> `"depth20@100ms"`.
pub fn stream_type(stream: &str) -> &str {
    match stream.split_once('@') {
        Some((_, suffix)) => suffix,
        None => stream,
    }
}

// =============================================================================
// TESTS
// =============================================================================
