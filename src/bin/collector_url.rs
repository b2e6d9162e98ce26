//! Collector URL inspector
//!
//! Reproduces the collector's WebSocket subscription URL from its stream
//! templates and a symbol list, without connecting. Useful for eyeballing
//! exactly what the collector subscribes to and how long the URL gets.
//!
//! Usage:
//!   cargo run --bin collector_url
//!   cargo run --bin collector_url -- BTCUSDT ETHUSDT

use clap::Parser;

use depthwatch::{report, streams};

#[derive(Parser, Debug)]
#[command(name = "collector_url")]
#[command(about = "Print the collector's combined-stream subscription URL")]
struct Args {
    /// Symbols the collector is configured with
    #[arg(default_values_t = [
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "SOLUSDT".to_string(),
    ])]
    symbols: Vec<String>,
}

fn main() {
    let args = Args::parse();

    let stream_names = streams::expand_streams(&args.symbols, streams::SPOT_STREAM_TEMPLATES);
    let url = streams::combined_url(&stream_names);

    print!("{}", report::render_subscription_plan(&stream_names, &url));
    println!();
    println!("Total: {} streams", stream_names.len());
}
