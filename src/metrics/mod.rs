//! Prometheus metrics for frame decoding.
//!
//! # Metrics Exposed
//!
//! - `d2mac_frames_decoded_total` - Frames decoded
//! - `d2mac_lines_decoded_total` - Data lines synchronised and sampled
//! - `d2mac_sync_lost_total` - Lines whose sync word was not found
//! - `d2mac_packets_total` - Packets recovered
//! - `d2mac_last_frame_lost_lines` - Lost lines in the most recent frame
//! - `d2mac_last_frame_sync_ratio` - Fraction of lines synchronised in the most recent frame
//!
//! # Example
//!
//! ```no_run
//! use d2mac_decode::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     lines: 623,
//!     lost_lines: 2,
//!     packets: 82,
//!     sync_ratio: 621.0 / 623.0,
//! };
//!
//! registry.record(&snapshot);
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
