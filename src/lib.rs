//! depthwatch - Binance spot market-data feed diagnostics
//!
//! Exposes the core modules for use by the probe binaries and tests:
//! - `continuity`: depth-diff sequence continuity checking (the core logic)
//! - `capture`: reading collector capture files (plain or gzipped)
//! - `message`: strict classification of stream payloads
//! - `streams`: stream-name expansion and WebSocket URL construction
//! - `probe`: bounded single-connection WebSocket probes
//! - `report`: console report rendering

pub mod capture;
pub mod continuity;
pub mod message;
pub mod probe;
pub mod report;
pub mod streams;

// Re-export the checker types at crate root for convenience
pub use continuity::{ContinuityReport, ContinuityState, DepthUpdateRecord, GapRecord};
