//! Stream payload classification
//!
//! Strict serde-based parsing of Binance spot public stream payloads. Every
//! decoded message is explicitly classified as one of the known event shapes
//! or rejected, so downstream logic never touches shape-uncertain JSON:
//! - `depthUpdate` diff events (`e`/`s`/`U`/`u`, tagged)
//! - `trade` events (tagged)
//! - 20-level partial book snapshots (`lastUpdateId`, no `e`, no `s`)
//! - bookTicker top-of-book updates (`b`/`B`/`a`/`A`, no `e`)
//!
//! Combined-stream messages arrive wrapped in `{"stream": ..., "data": ...}`;
//! raw (`/ws/<stream>`) subscriptions deliver the payload at the top level.
//! Partial book snapshots carry no symbol field at all, so the symbol has to
//! be recovered from the stream name.

use serde::Deserialize;
use serde_json::Value;

/// A `[price, quantity]` level, both decimal strings on the wire.
pub type Level = [String; 2];

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Combined-stream envelope: `{"stream": "btcusdt@depth@100ms", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedMessage {
    pub stream: String,
    pub data: Value,
}

/// Order-book diff: incremental changes since the previous diff, covering
/// the inclusive update-id range `[U, u]`.
#[derive(Debug, Clone, Deserialize)]
pub struct DepthDiffEvent {
    #[serde(rename = "E", default)]
    pub event_time_ms: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "U")]
    pub first_update_id: i64,
    #[serde(rename = "u")]
    pub last_update_id: i64,
    #[serde(rename = "b", default)]
    pub bids: Vec<Level>,
    #[serde(rename = "a", default)]
    pub asks: Vec<Level>,
}

/// Trade print.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeEvent {
    #[serde(rename = "E", default)]
    pub event_time_ms: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t", default)]
    pub trade_id: i64,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    #[serde(rename = "m", default)]
    pub buyer_is_maker: bool,
}

/// 20-level partial book snapshot. No event type, no symbol field.
#[derive(Debug, Clone, Deserialize)]
pub struct PartialBookSnapshot {
    #[serde(rename = "lastUpdateId")]
    pub last_update_id: i64,
    pub bids: Vec<Level>,
    pub asks: Vec<Level>,
}

/// Best bid/offer update. No event type on the spot stream.
#[derive(Debug, Clone, Deserialize)]
pub struct BookTickerEvent {
    #[serde(rename = "u", default)]
    pub update_id: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bid_price: String,
    #[serde(rename = "B")]
    pub bid_qty: String,
    #[serde(rename = "a")]
    pub ask_price: String,
    #[serde(rename = "A")]
    pub ask_qty: String,
}

/// Payloads that announce their type via the `e` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "e")]
enum TaggedEvent {
    #[serde(rename = "depthUpdate")]
    DepthUpdate(DepthDiffEvent),
    #[serde(rename = "trade")]
    Trade(TradeEvent),
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// A successfully classified stream payload.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    DepthDiff(DepthDiffEvent),
    Trade(TradeEvent),
    PartialBook(PartialBookSnapshot),
    BookTicker(BookTickerEvent),
}

impl MarketEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DepthDiff(_) => "depthUpdate",
            Self::Trade(_) => "trade",
            Self::PartialBook(_) => "partialBook",
            Self::BookTicker(_) => "bookTicker",
        }
    }
}

/// Classify a decoded payload (the `data` object of a combined message, or
/// the whole top-level object of a raw subscription).
///
/// Returns `None` for payloads that match none of the known shapes; the
/// caller counts those rather than guessing.
pub fn classify(payload: &Value) -> Option<MarketEvent> {
    if payload.get("e").is_some() {
        return match serde_json::from_value::<TaggedEvent>(payload.clone()) {
            Ok(TaggedEvent::DepthUpdate(ev)) => Some(MarketEvent::DepthDiff(ev)),
            Ok(TaggedEvent::Trade(ev)) => Some(MarketEvent::Trade(ev)),
            Err(_) => None,
        };
    }
    if payload.get("lastUpdateId").is_some() {
        return serde_json::from_value(payload.clone())
            .ok()
            .map(MarketEvent::PartialBook);
    }
    if payload.get("B").is_some() && payload.get("A").is_some() {
        return serde_json::from_value(payload.clone())
            .ok()
            .map(MarketEvent::BookTicker);
    }
    None
}

/// Parse a combined-stream message. Fails if the envelope shape is wrong.
pub fn parse_combined(raw: &str) -> Option<CombinedMessage> {
    serde_json::from_str(raw).ok()
}

/// Recover the symbol from a stream name: `"btcusdt@depth20@100ms"` ->
/// `"BTCUSDT"`. Needed for payloads that carry no `s` field.
pub fn symbol_from_stream(stream: &str) -> Option<String> {
    let name = stream.split('@').next()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_uppercase())
}

// =============================================================================
// FORMAT INSPECTION
// =============================================================================

/// Field-presence summary of one message, for the format probes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSummary {
    pub byte_len: usize,
    /// Combined-stream envelope fields
    pub has_stream: bool,
    pub stream: Option<String>,
    pub has_data: bool,
    /// Payload fields (of `data`, or of the top level for raw subscriptions)
    pub payload_has_symbol: bool,
    pub payload_has_event_type: bool,
    pub event_type: Option<String>,
    pub has_last_update_id: bool,
    pub bid_levels: Option<usize>,
    pub ask_levels: Option<usize>,
    pub best_bid: Option<String>,
    pub best_ask: Option<String>,
    /// First few payload field names
    pub payload_fields: Vec<String>,
}

const MAX_SUMMARY_FIELDS: usize = 10;

/// Summarize which fields a message carries. Returns `None` if the text is
/// not a JSON object.
pub fn summarize(raw: &str) -> Option<FormatSummary> {
    let value: Value = serde_json::from_str(raw).ok()?;
    value.as_object()?;

    let mut summary = FormatSummary {
        byte_len: raw.len(),
        has_stream: value.get("stream").is_some(),
        stream: value
            .get("stream")
            .and_then(Value::as_str)
            .map(str::to_string),
        has_data: value.get("data").is_some(),
        ..FormatSummary::default()
    };

    // Raw subscriptions put the payload at the top level
    let payload = value.get("data").unwrap_or(&value);

    summary.payload_has_symbol = payload.get("s").is_some();
    summary.payload_has_event_type = payload.get("e").is_some();
    summary.event_type = payload
        .get("e")
        .and_then(Value::as_str)
        .map(str::to_string);
    summary.has_last_update_id = payload.get("lastUpdateId").is_some();

    // Diff events abbreviate the level fields to `b`/`a`
    let bids = side_levels(payload, "bids", "b");
    let asks = side_levels(payload, "asks", "a");
    summary.bid_levels = bids.map(Vec::len);
    summary.ask_levels = asks.map(Vec::len);
    summary.best_bid = top_price(bids);
    summary.best_ask = top_price(asks);

    if let Some(obj) = payload.as_object() {
        summary.payload_fields = obj.keys().take(MAX_SUMMARY_FIELDS).cloned().collect();
    }

    Some(summary)
}

fn side_levels<'a>(payload: &'a Value, name: &str, short: &str) -> Option<&'a Vec<Value>> {
    payload
        .get(name)
        .or_else(|| payload.get(short))
        .and_then(Value::as_array)
}

fn top_price(levels: Option<&Vec<Value>>) -> Option<String> {
    levels
        .and_then(|ls| ls.first())
        .and_then(Value::as_array)
        .and_then(|level| level.first())
        .and_then(Value::as_str)
        .map(str::to_string)
}

// =============================================================================
// TESTS
// =============================================================================
