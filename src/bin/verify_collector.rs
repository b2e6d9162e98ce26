//! Collector subscription verifier
//!
//! Builds the collector's exact combined-stream URL from a symbol list,
//! connects to it, collects for a fixed window, and reports per-symbol,
//! per-stream-type message counts and rates - the quickest way to tell
//! whether every stream the collector subscribes to actually delivers.
//!
//! Usage:
//!   cargo run --bin verify_collector
//!   cargo run --bin verify_collector -- BTCUSDT ETHUSDT --duration-secs 10

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use depthwatch::{
    probe::{self, StreamProbe},
    report, streams,
};

#[derive(Parser, Debug)]
#[command(name = "verify_collector")]
#[command(about = "Verify that every stream the collector subscribes to delivers data")]
struct Args {
    /// Symbols the collector is configured with
    #[arg(default_values_t = [
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
    ])]
    symbols: Vec<String>,

    /// Collection window in seconds
    #[arg(long, default_value_t = 30)]
    duration_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let stream_names = streams::expand_streams(&args.symbols, streams::SPOT_STREAM_TEMPLATES);
    let url = streams::combined_url(&stream_names);

    print!("{}", report::render_subscription_plan(&stream_names, &url));
    println!();

    let mut probe = StreamProbe::connect(&url).await?;
    info!(
        streams = stream_names.len(),
        duration_secs = args.duration_secs,
        "collecting"
    );
    println!(
        "Connected. Collecting for {}s...",
        args.duration_secs
    );
    println!();

    let activity =
        probe::collect_stream_activity(&mut probe, Duration::from_secs(args.duration_secs)).await?;

    let (text, _all_active) = report::render_stream_activity(
        &args.symbols,
        streams::SPOT_STREAM_TEMPLATES,
        &activity,
    );
    print!("{text}");

    Ok(())
}
