//! Bounded single-connection WebSocket probes
//!
//! Every probe in this crate opens one connection, reads a bounded number
//! of messages or runs for a fixed wall-clock duration, and reports what it
//! saw. There is deliberately no reconnect or backoff machinery here: a
//! probe that loses its connection has produced its diagnostic.
//!
//! Server pings are answered with pongs; close frames and transport errors
//! end the probe with an error.

use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, Context, Result};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{
    net::TcpStream,
    time::{timeout, timeout_at, Instant},
};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::message;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-read idle timeout used by the duration-bounded collectors.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// PROBE CONNECTION
// =============================================================================

/// One live probe connection.
pub struct StreamProbe {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    url: String,
}

impl StreamProbe {
    /// Connect with the default timeout.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_timeout(url, DEFAULT_CONNECT_TIMEOUT).await
    }

    pub async fn connect_with_timeout(url: &str, connect_timeout: Duration) -> Result<Self> {
        debug!(url, "connecting");
        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url))
            .await
            .map_err(|_| anyhow!("connect timeout after {connect_timeout:?}"))?
            .with_context(|| format!("websocket connect failed: {url}"))?;

        let (write, read) = ws_stream.split();
        Ok(Self {
            write,
            read,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait up to `idle_timeout` for the next text frame.
    ///
    /// `Ok(None)` means nothing arrived in time; control frames are handled
    /// inline (pings answered, pongs ignored) without resetting the clock.
    /// A close frame, a transport error, or stream end is an error.
    pub async fn next_text(&mut self, idle_timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + idle_timeout;

        loop {
            let frame = match timeout_at(deadline, self.read.next()).await {
                Err(_) => return Ok(None),
                Ok(frame) => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Ping(payload))) => {
                    self.write
                        .send(Message::Pong(payload))
                        .await
                        .context("failed to answer ping")?;
                }
                Some(Ok(Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    return Err(anyhow!("server closed connection: {frame:?}"));
                }
                Some(Err(e)) => return Err(e).context("websocket error"),
                None => return Err(anyhow!("stream ended")),
            }
        }
    }

    /// Read up to `count` text frames, allowing `per_message_timeout` for
    /// each. Stops early once a read times out.
    pub async fn collect_text(
        &mut self,
        count: usize,
        per_message_timeout: Duration,
    ) -> Result<Vec<String>> {
        let mut messages = Vec::with_capacity(count);
        while messages.len() < count {
            match self.next_text(per_message_timeout).await? {
                Some(text) => messages.push(text),
                None => break,
            }
        }
        Ok(messages)
    }
}

/// Connect to `url` and wait for a single message. `Ok(None)` means the
/// stream accepted the subscription but stayed silent for `idle_timeout` -
/// how unsupported depth20 variants present themselves.
pub async fn await_first_text(url: &str, idle_timeout: Duration) -> Result<Option<String>> {
    let mut probe = StreamProbe::connect(url).await?;
    probe.next_text(idle_timeout).await
}

// =============================================================================
// STREAM ACTIVITY COLLECTION
// =============================================================================

/// Per-stream message counts accumulated over a timed collection window.
#[derive(Debug, Default)]
pub struct StreamActivity {
    /// All text frames received, enveloped or not
    pub total_messages: u64,
    /// Frames without a combined-stream envelope
    pub unenveloped: u64,
    /// Messages per stream name
    pub counts: HashMap<String, u64>,
    /// Actual wall-clock collection time
    pub elapsed: Duration,
}

impl StreamActivity {
    pub fn record(&mut self, raw: &str) {
        self.total_messages += 1;
        match message::parse_combined(raw) {
            Some(msg) => *self.counts.entry(msg.stream).or_insert(0) += 1,
            None => self.unenveloped += 1,
        }
    }

    pub fn count(&self, stream: &str) -> u64 {
        self.counts.get(stream).copied().unwrap_or(0)
    }

    /// Messages per second for one stream over the collection window.
    pub fn rate(&self, stream: &str) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.count(stream) as f64 / secs
        } else {
            0.0
        }
    }

    pub fn active_stream_count(&self) -> usize {
        self.counts.values().filter(|&&c| c > 0).count()
    }
}

/// Count messages per stream for `duration`, polling with
/// [`DEFAULT_IDLE_TIMEOUT`] so a silent connection still terminates on
/// schedule.
pub async fn collect_stream_activity(
    probe: &mut StreamProbe,
    duration: Duration,
) -> Result<StreamActivity> {
    let start = Instant::now();
    let deadline = start + duration;
    let mut activity = StreamActivity::default();

    while Instant::now() < deadline {
        let idle = DEFAULT_IDLE_TIMEOUT.min(deadline - Instant::now());
        if let Some(text) = probe.next_text(idle).await? {
            activity.record(&text);
        }
    }

    activity.elapsed = start.elapsed();
    Ok(activity)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_counts_per_stream() {
        let mut activity = StreamActivity::default();
        activity.record(r#"{"stream":"btcusdt@trade","data":{"e":"trade"}}"#);
        activity.record(r#"{"stream":"btcusdt@trade","data":{"e":"trade"}}"#);
        activity.record(r#"{"stream":"ethusdt@bookTicker","data":{}}"#);
        activity.record("not json");

        assert_eq!(activity.total_messages, 4);
        assert_eq!(activity.unenveloped, 1);
        assert_eq!(activity.count("btcusdt@trade"), 2);
        assert_eq!(activity.count("ethusdt@bookTicker"), 1);
        assert_eq!(activity.count("solusdt@trade"), 0);
        assert_eq!(activity.active_stream_count(), 2);
    }

    #[test]
    fn test_activity_rate_over_window() {
        let mut activity = StreamActivity::default();
        activity.record(r#"{"stream":"btcusdt@trade","data":{}}"#);
        activity.record(r#"{"stream":"btcusdt@trade","data":{}}"#);
        activity.record(r#"{"stream":"btcusdt@trade","data":{}}"#);
        activity.elapsed = Duration::from_secs(2);

        assert!((activity.rate("btcusdt@trade") - 1.5).abs() < f64::EPSILON);
        assert_eq!(activity.rate("ethusdt@trade"), 0.0);
    }

    #[test]
    fn test_activity_rate_with_zero_elapsed() {
        let mut activity = StreamActivity::default();
        activity.record(r#"{"stream":"btcusdt@trade","data":{}}"#);
        assert_eq!(activity.rate("btcusdt@trade"), 0.0);
    }
}
