//! Stream format inspector
//!
//! Connects to Binance spot streams and prints field-presence summaries for
//! the first few messages, in raw (`/ws/<stream>`) and/or combined
//! (`/stream?streams=`) subscription mode. This is how the depth20 payload
//! quirk was pinned down: combined messages keep the envelope, but the
//! snapshot payload carries neither `s` nor `e`.
//!
//! Usage:
//!   cargo run --bin stream_format
//!   cargo run --bin stream_format -- btcusdt@depth20@100ms --mode both
//!   cargo run --bin stream_format -- btcusdt@trade ethusdt@trade --count 1

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use depthwatch::{
    message,
    probe::StreamProbe,
    report, streams,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Single-stream subscription: payload at the top level
    Raw,
    /// Multi-stream subscription: `{"stream": ..., "data": ...}` envelope
    Combined,
    /// Inspect both subscription modes per stream
    Both,
}

#[derive(Parser, Debug)]
#[command(name = "stream_format")]
#[command(about = "Inspect the message format of Binance spot streams")]
struct Args {
    /// Stream names to inspect
    #[arg(default_values_t = [
        "btcusdt@trade".to_string(),
        "btcusdt@bookTicker".to_string(),
        "btcusdt@depth@100ms".to_string(),
        "btcusdt@depth20@100ms".to_string(),
    ])]
    streams: Vec<String>,

    /// Subscription mode to inspect
    #[arg(long, value_enum, default_value_t = Mode::Combined)]
    mode: Mode,

    /// Messages to summarize per stream
    #[arg(long, default_value_t = 3)]
    count: usize,

    /// Per-message wait in seconds
    #[arg(long, default_value_t = 3)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let per_message = Duration::from_secs(args.timeout_secs);

    for stream in &args.streams {
        if matches!(args.mode, Mode::Raw | Mode::Both) {
            inspect(&streams::raw_url(stream), stream, "raw", args.count, per_message).await;
        }
        if matches!(args.mode, Mode::Combined | Mode::Both) {
            let url = streams::combined_url(std::slice::from_ref(stream));
            inspect(&url, stream, "combined", args.count, per_message).await;
        }
    }

    Ok(())
}

async fn inspect(url: &str, stream: &str, mode: &str, count: usize, per_message: Duration) {
    println!("=== {stream} ({mode}) ===");

    let mut probe = match StreamProbe::connect(url).await {
        Ok(probe) => probe,
        Err(e) => {
            println!("✗ connect failed: {e:#}");
            println!();
            return;
        }
    };

    match probe.collect_text(count, per_message).await {
        Ok(messages) if messages.is_empty() => {
            println!("✗ no messages within {}s", per_message.as_secs());
        }
        Ok(messages) => {
            for (i, raw) in messages.iter().enumerate() {
                match message::summarize(raw) {
                    Some(summary) => print!("{}", report::render_format_summary(i + 1, &summary)),
                    None => println!("Message #{}: not a JSON object", i + 1),
                }
            }
        }
        Err(e) => println!("✗ read failed: {e:#}"),
    }
    println!();
}
