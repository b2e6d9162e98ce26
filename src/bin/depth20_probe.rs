//! depth20 stream support probe
//!
//! Binance spot documents partial-book streams as `<symbol>@depth20` with
//! optional `@100ms`/`@1000ms` suffixes; the collector subscribes to
//! `@depth20@100ms`. This probe settles which variants actually deliver
//! data, measures their message rates, and confirms that the diff stream
//! and the snapshot stream coexist on one combined connection:
//! 1. per-variant support check (first message within a timeout)
//! 2. timed rate measurement per supported variant
//! 3. dual subscription of `depth@100ms` + `depth20@100ms`
//!
//! Usage:
//!   cargo run --bin depth20_probe
//!   cargo run --bin depth20_probe -- --symbol ethusdt --rate-secs 5

use std::{collections::BTreeSet, time::Duration};

use anyhow::Result;
use clap::Parser;
use tokio::time::Instant;

use depthwatch::{
    message,
    probe::{self, StreamProbe},
    report, streams,
};

#[derive(Parser, Debug)]
#[command(name = "depth20_probe")]
#[command(about = "Probe which depth20 stream variants Binance spot supports")]
struct Args {
    /// Symbol to probe (lowercase stream-name form)
    #[arg(long, default_value = "btcusdt")]
    symbol: String,

    /// Wait for the first message of each variant, in seconds
    #[arg(long, default_value_t = 5)]
    first_timeout_secs: u64,

    /// Rate-measurement window per variant, in seconds (0 skips the phase)
    #[arg(long, default_value_t = 10)]
    rate_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let symbol = args.symbol.to_lowercase();

    let variants = [
        format!("{symbol}@depth20"),
        format!("{symbol}@depth20@250ms"),
        format!("{symbol}@depth20@100ms"),
    ];

    println!("=== depth20 Variant Support ===");
    let mut supported = Vec::new();
    for variant in &variants {
        check_variant(variant, Duration::from_secs(args.first_timeout_secs), &mut supported).await;
    }

    if args.rate_secs > 0 {
        println!("=== Message Rates ===");
        for variant in &supported {
            measure_rate(variant, Duration::from_secs(args.rate_secs)).await;
        }
    }

    dual_subscription_check(&symbol).await;

    Ok(())
}

async fn check_variant(variant: &str, timeout: Duration, supported: &mut Vec<String>) {
    println!("--- {variant} ---");
    match probe::await_first_text(&streams::raw_url(variant), timeout).await {
        Ok(Some(raw)) => {
            println!("✓ supported, first message received");
            if let Some(summary) = message::summarize(&raw) {
                print!("{}", report::render_format_summary(1, &summary));
            }
            supported.push(variant.to_string());
        }
        Ok(None) => {
            println!("✗ no data within {}s - variant likely unsupported", timeout.as_secs());
        }
        Err(e) => {
            println!("✗ connection failed: {e:#}");
        }
    }
    println!();
}

async fn measure_rate(variant: &str, window: Duration) {
    println!("--- {variant} ({}s window) ---", window.as_secs());

    let mut probe = match StreamProbe::connect(&streams::raw_url(variant)).await {
        Ok(probe) => probe,
        Err(e) => {
            println!("✗ connect failed: {e:#}");
            println!();
            return;
        }
    };

    let start = Instant::now();
    let deadline = start + window;
    let mut count = 0u64;

    while Instant::now() < deadline {
        let idle = probe::DEFAULT_IDLE_TIMEOUT.min(deadline - Instant::now());
        match probe.next_text(idle).await {
            Ok(Some(raw)) => {
                count += 1;
                // Summarize the first few so level counts are visible
                if count <= 3 {
                    if let Some(summary) = message::summarize(&raw) {
                        print!("{}", report::render_format_summary(count as usize, &summary));
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                println!("✗ read failed: {e:#}");
                break;
            }
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!("Total: {count} messages in {elapsed:.1}s ({:.2}/s)", count as f64 / elapsed.max(f64::MIN_POSITIVE));
    if count > 0 {
        println!("✓ stream is delivering data");
    } else {
        println!("✗ no data received");
    }
    println!();
}

/// Both depth streams must coexist on one combined connection - this is
/// exactly what the collector subscribes to.
async fn dual_subscription_check(symbol: &str) {
    let names = vec![
        format!("{symbol}@depth@100ms"),
        format!("{symbol}@depth20@100ms"),
    ];
    let url = streams::combined_url(&names);

    println!("=== Dual Subscription ({} + {}) ===", names[0], names[1]);

    let mut probe = match StreamProbe::connect(&url).await {
        Ok(probe) => probe,
        Err(e) => {
            println!("✗ connect failed: {e:#}");
            return;
        }
    };

    let mut seen = BTreeSet::new();
    for _ in 0..20 {
        match probe.next_text(Duration::from_secs(2)).await {
            Ok(Some(raw)) => {
                if let Some(msg) = message::parse_combined(&raw) {
                    seen.insert(msg.stream);
                }
            }
            Ok(None) => break,
            Err(e) => {
                println!("✗ read failed: {e:#}");
                break;
            }
        }
    }

    println!("Streams seen:");
    for stream in &seen {
        println!("  ✓ {stream}");
    }
    for name in &names {
        if !seen.contains(name) {
            println!("  ✗ {name} (no data)");
        }
    }

    if names.iter().all(|n| seen.contains(n)) {
        println!("✓ both depth streams deliver on one connection");
    } else {
        println!("✗ at least one depth stream stayed silent");
    }
}
