//! Per-frame decode results and diagnostics.

use crate::line::LineSync;
use crate::packet::Packet;

use super::Bitstream;

/// Sync outcome of one decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineReport {
    /// Data line index (0 = first raster line).
    pub line: usize,
    /// Raster row that was sampled.
    pub row: usize,
    /// Sync search result.
    pub sync: LineSync,
}

/// Non-fatal problems met while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeWarning {
    /// No sync word matched on a line.
    #[error("line {line}: sync word not found, fallback offset {fallback_offset}")]
    SyncNotFound {
        /// Data line index.
        line: usize,
        /// Offset the line would be sampled from.
        fallback_offset: isize,
    },
}

/// The concatenated line bits of a frame, before packet splitting.
#[derive(Debug, Clone)]
pub struct FrameBits {
    /// Placeholder bits followed by every decoded line, in line order.
    pub bits: Bitstream,
    /// One report per decoded line.
    pub lines: Vec<LineReport>,
    /// Lines that lost sync.
    pub warnings: Vec<DecodeWarning>,
}

/// A fully decoded frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Packets in transmission order.
    pub packets: Vec<Packet>,
    /// One report per decoded line.
    pub lines: Vec<LineReport>,
    /// Lines that lost sync.
    pub warnings: Vec<DecodeWarning>,
}

impl DecodedFrame {
    /// Lines whose sync word was not found.
    pub fn lost_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines
            .iter()
            .filter(|report| !report.sync.is_found())
            .map(|report| report.line)
    }

    /// Sync offsets of all decoded lines, `None` where sync was lost.
    pub fn sync_offsets(&self) -> Vec<Option<isize>> {
        self.lines
            .iter()
            .map(|report| report.sync.is_found().then(|| report.sync.offset()))
            .collect()
    }

    /// Fraction of decoded lines that found their sync word.
    pub fn sync_ratio(&self) -> f64 {
        if self.lines.is_empty() {
            return 0.0;
        }
        let found = self.lines.iter().filter(|r| r.sync.is_found()).count();
        found as f64 / self.lines.len() as f64
    }
}
