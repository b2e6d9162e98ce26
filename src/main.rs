//! Depth capture continuity analyzer
//!
//! Validates the sequence-number continuity of a collector's captured
//! depth-diff stream. Reads a capture file (plain or gzipped), filters it
//! to depthUpdate events, and checks each symbol's update-id ranges for
//! gaps per the exchange's continuity rule: a diff attaches whenever
//! `U <= prev_u + 1`; only `U > prev_u + 1` means updates were lost.
//!
//! Usage:
//!   cargo run -- /data/binance/spot/btcusdt_20251017.gz
//!   cargo run -- capture.gz --max-lines 50000 --symbol BTCUSDT
//!
//! Exits non-zero when any analyzed symbol has a gap.

use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use depthwatch::{
    capture, continuity,
    report::{self, SymbolContinuity},
};

#[derive(Parser, Debug)]
#[command(name = "depthwatch")]
#[command(about = "Check depth-diff sequence continuity in a collector capture")]
struct Args {
    /// Capture file written by the collector (.gz or plain text)
    capture: PathBuf,

    /// Stop after this many lines (whole file if omitted)
    #[arg(long)]
    max_lines: Option<u64>,

    /// Only analyze this symbol
    #[arg(long)]
    symbol: Option<String>,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let symbol_filter = args.symbol.map(|s| s.to_uppercase());

    let scan = capture::scan_file(&args.capture, args.max_lines)?;

    let mut results = Vec::new();
    for (symbol, records) in &scan.per_symbol {
        if symbol_filter.as_ref().is_some_and(|f| f != symbol) {
            continue;
        }

        let checked = continuity::check(records.iter().cloned());
        for gap in &checked.gaps {
            warn!(
                %symbol,
                prev_u = gap.previous_last_update_id(),
                U = gap.observed_first_update_id,
                gap = gap.gap_size,
                "missing depth feed has been detected"
            );
        }

        results.push(SymbolContinuity {
            symbol: symbol.clone(),
            report: checked,
        });
    }

    let source = args.capture.display().to_string();
    let (text, all_continuous) = report::render_capture_report(&source, &scan, &results);
    print!("{text}");

    Ok(if all_continuous {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
