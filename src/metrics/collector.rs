//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

use crate::frame::DecodedFrame;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Summary of one decoded frame.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Data lines decoded.
    pub lines: usize,
    /// Lines whose sync word was not found.
    pub lost_lines: usize,
    /// Packets recovered.
    pub packets: usize,
    /// Fraction of lines synchronised.
    pub sync_ratio: f64,
}

impl MetricsSnapshot {
    /// Summarises a decoded frame.
    pub fn from_frame(frame: &DecodedFrame) -> Self {
        Self {
            lines: frame.lines.len(),
            lost_lines: frame.warnings.len(),
            packets: frame.packets.len(),
            sync_ratio: frame.sync_ratio(),
        }
    }
}

/// Prometheus metrics registry for frame decoding.
pub struct MetricsRegistry {
    registry: Registry,

    frames_decoded: IntCounter,
    lines_decoded: IntCounter,
    sync_lost: IntCounter,
    packets: IntCounter,

    last_frame_lost_lines: IntGauge,
    last_frame_sync_ratio: Gauge,
}

impl MetricsRegistry {
    /// Creates a new registry with all decode metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let frames_decoded =
            IntCounter::new("d2mac_frames_decoded_total", "Total number of frames decoded")?;
        let lines_decoded = IntCounter::new(
            "d2mac_lines_decoded_total",
            "Total number of data lines synchronised and sampled",
        )?;
        let sync_lost = IntCounter::new(
            "d2mac_sync_lost_total",
            "Total number of lines whose sync word was not found",
        )?;
        let packets = IntCounter::new("d2mac_packets_total", "Total number of packets recovered")?;

        let last_frame_lost_lines = IntGauge::new(
            "d2mac_last_frame_lost_lines",
            "Lines without sync in the most recent frame",
        )?;
        let last_frame_sync_ratio = Gauge::new(
            "d2mac_last_frame_sync_ratio",
            "Fraction of lines synchronised in the most recent frame",
        )?;

        registry.register(Box::new(frames_decoded.clone()))?;
        registry.register(Box::new(lines_decoded.clone()))?;
        registry.register(Box::new(sync_lost.clone()))?;
        registry.register(Box::new(packets.clone()))?;
        registry.register(Box::new(last_frame_lost_lines.clone()))?;
        registry.register(Box::new(last_frame_sync_ratio.clone()))?;

        Ok(Self {
            registry,
            frames_decoded,
            lines_decoded,
            sync_lost,
            packets,
            last_frame_lost_lines,
            last_frame_sync_ratio,
        })
    }

    /// Accounts for one decoded frame.
    pub fn record(&self, snapshot: &MetricsSnapshot) {
        self.frames_decoded.inc();
        self.lines_decoded.inc_by(snapshot.lines as u64);
        self.sync_lost.inc_by(snapshot.lost_lines as u64);
        self.packets.inc_by(snapshot.packets as u64);

        self.last_frame_lost_lines.set(snapshot.lost_lines as i64);
        self.last_frame_sync_ratio.set(snapshot.sync_ratio);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
