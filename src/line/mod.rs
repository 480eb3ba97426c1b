//! Per-line signal recovery.
//!
//! Each data line starts with a 6-bit synchronisation word followed by the
//! line's scrambled data bits. Recovering a line takes three steps:
//!
//! ```text
//! raster row → sync search (offset) → sampling + descrambling → bits
//! ```
//!
//! All horizontal positions are derived from a [`SymbolClock`], which keeps
//! the samples-per-symbol ratio exact so that no rounding drift builds up
//! across a line.

mod classifier;
mod sampler;
mod sync;

pub use classifier::{bit_value, Classifier, Polarity};
pub use sampler::LineSampler;
pub use sync::{LineSync, LineSynchronizer, SyncPolarity, SYNC_WORD, SYNC_WORD_INVERTED};

use crate::config::{SignalConfig, SYNC_WORD_BITS};

/// Exact ratio of raster samples to data symbols.
///
/// Positions are counted in half symbols so that symbol centres are exact
/// as well. Every position is rounded down to a whole sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolClock {
    num: u64,
    den: u64,
}

impl SymbolClock {
    /// Creates a clock of `num / den` samples per symbol.
    pub fn new(num: u64, den: u64) -> Self {
        let g = gcd(num, den).max(1);
        Self {
            num: num / g,
            den: den / g,
        }
    }

    /// Derives the clock from the signal rates and oversampling factor.
    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(
            config
                .sample_rate
                .saturating_mul(u64::from(config.oversampling_factor)),
            config.symbol_rate,
        )
    }

    /// Samples per symbol as a reduced fraction.
    #[inline]
    pub fn ratio(&self) -> (u64, u64) {
        (self.num, self.den)
    }

    /// Sample offset of a position `half_symbols` half symbols in.
    ///
    /// Saturates at `usize::MAX` for clocks too fast for the position.
    #[inline]
    pub fn offset(&self, half_symbols: usize) -> usize {
        let samples = half_symbols as u128 * u128::from(self.num) / (2 * u128::from(self.den));
        usize::try_from(samples).unwrap_or(usize::MAX)
    }

    /// Offset of the start of symbol `index`.
    #[inline]
    pub fn symbol_start(&self, index: usize) -> usize {
        self.offset(2 * index)
    }

    /// Samples covered by the sync word scan window.
    #[inline]
    pub fn sync_window(&self) -> usize {
        self.symbol_start(SYNC_WORD_BITS)
    }

    /// Offset of data bit `bit`, relative to a sync offset.
    ///
    /// The sync offset sits one sample before the first sync sample, so
    /// together with the half-symbol step this lands inside the data symbol.
    #[inline]
    pub fn data_offset(&self, bit: usize) -> usize {
        self.offset(2 * (SYNC_WORD_BITS + bit) + 1)
    }
}

impl Default for SymbolClock {
    fn default() -> Self {
        Self::from_config(&SignalConfig::default())
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Smallest raster width that holds a full line whose sync word starts at
/// the left edge.
pub fn min_width(config: &SignalConfig) -> usize {
    let clock = SymbolClock::from_config(config);
    let last = clock.data_offset(config.bits_per_data_line.saturating_sub(1));
    // Sync offset of a word starting at column 0 is -1.
    last.max(clock.sync_window() + 1)
}
