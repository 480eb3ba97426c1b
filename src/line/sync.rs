//! Line synchronisation word search.

use super::{Classifier, SymbolClock};
use crate::config::{SignalConfig, SYNC_WORD_BITS};
use crate::raster::Raster;

/// Sync word as read in transmission order, first bit in bit 0.
pub const SYNC_WORD: u8 = 0x34;

/// Sync word of a line sent with inverted polarity.
pub const SYNC_WORD_INVERTED: u8 = 0x0B;

/// Which form of the sync word was matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPolarity {
    /// Sync word in its transmitted form.
    Normal,
    /// Sync word with every symbol inverted.
    Inverted,
}

impl SyncPolarity {
    /// Recognises a 6-bit sync word.
    pub fn from_word(word: u8) -> Option<Self> {
        match word {
            SYNC_WORD => Some(SyncPolarity::Normal),
            SYNC_WORD_INVERTED => Some(SyncPolarity::Inverted),
            _ => None,
        }
    }

    /// Returns the sync word bits for this polarity.
    pub fn word(self) -> u8 {
        match self {
            SyncPolarity::Normal => SYNC_WORD,
            SyncPolarity::Inverted => SYNC_WORD_INVERTED,
        }
    }
}

/// Outcome of a sync search on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSync {
    /// Sync word found; `offset` is the column just before its first sample.
    Found {
        /// Column before the first sync sample.
        offset: isize,
        /// Form of the word that matched.
        polarity: SyncPolarity,
    },
    /// Scan exhausted; `fallback_offset` is the scan bound minus one.
    Lost {
        /// Offset the line is sampled from under the best-effort policy.
        fallback_offset: isize,
    },
}

impl LineSync {
    /// Offset to sample the line from, found or not.
    #[inline]
    pub fn offset(&self) -> isize {
        match *self {
            LineSync::Found { offset, .. } => offset,
            LineSync::Lost { fallback_offset } => fallback_offset,
        }
    }

    /// Returns true if the sync word was matched.
    #[inline]
    pub fn is_found(&self) -> bool {
        matches!(self, LineSync::Found { .. })
    }
}

/// Scans raster lines for the sync word.
#[derive(Debug, Clone)]
pub struct LineSynchronizer {
    clock: SymbolClock,
    classifier: Classifier,
    config: SignalConfig,
}

impl LineSynchronizer {
    /// Creates a synchronizer for the configured clock and thresholds.
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            clock: SymbolClock::from_config(config),
            classifier: Classifier::from_config(config),
            config: config.clone(),
        }
    }

    /// Reads the 6-bit word whose first sample is at column `x`.
    fn word_at<R: Raster + ?Sized>(&self, raster: &R, x: usize, row: usize) -> u8 {
        (0..SYNC_WORD_BITS).fold(0u8, |word, i| {
            let sample = raster.sample(x + self.clock.symbol_start(i), row);
            word | (self.classifier.bit(sample) << i)
        })
    }

    /// Finds the sync word of data line `line`, scanning left to right.
    ///
    /// Columns are scanned up to `width - sync window`; the first column
    /// whose word matches either polarity wins.
    pub fn find_sync<R: Raster + ?Sized>(&self, raster: &R, line: usize) -> LineSync {
        let row = self.config.row_for_line(line);
        let bound = raster.width().saturating_sub(self.clock.sync_window());

        if row < raster.height() {
            for x in 0..bound {
                if let Some(polarity) = SyncPolarity::from_word(self.word_at(raster, x, row)) {
                    let offset = x as isize - 1;
                    tracing::trace!(line, row, offset, ?polarity, "line sync found");
                    return LineSync::Found { offset, polarity };
                }
            }
        }

        LineSync::Lost {
            fallback_offset: bound as isize - 1,
        }
    }
}
