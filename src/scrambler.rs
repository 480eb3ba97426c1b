//! Line scrambler (PRBS) generation.
//!
//! The transmitter XORs each line's data with a 15-bit linear feedback
//! shift register sequence. Every line starts from its own register state,
//! obtained by stepping the frame seed a fixed number of times per line.
//! Descrambling is the same XOR, so one generator serves both directions.

use crate::config::SignalConfig;

/// Register value for the first line of the reference frame.
pub const PRBS_SEED: u16 = 0x7FFF;

/// Advances a 15-bit scrambler register by one step.
///
/// Bit 0 is XOR-folded with bit 14 into the new top bit while the register
/// shifts right. Returns the feedback bit.
#[inline]
pub fn advance(state: &mut u16) -> u8 {
    let bit = (*state ^ (*state >> 14)) & 1;
    *state = (*state >> 1) | (bit << 14);
    bit as u8
}

/// A scrambler sequence positioned at some register state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prbs {
    state: u16,
}

impl Prbs {
    /// Creates a generator starting at `seed`.
    pub fn new(seed: u16) -> Self {
        Self {
            state: seed & 0x7FFF,
        }
    }

    /// Returns the current register value.
    #[inline]
    pub fn state(&self) -> u16 {
        self.state
    }

    /// Produces the next sequence bit.
    #[inline]
    pub fn next_bit(&mut self) -> u8 {
        advance(&mut self.state)
    }

    /// Discards `steps` sequence bits.
    pub fn discard(&mut self, steps: usize) {
        for _ in 0..steps {
            advance(&mut self.state);
        }
    }

    /// XORs each bit (one per byte, 0 or 1) with the sequence in place.
    ///
    /// Applying the same fresh generator twice restores the input.
    pub fn apply(&mut self, bits: &mut [u8]) {
        for bit in bits.iter_mut() {
            *bit = (*bit & 1) ^ self.next_bit();
        }
    }
}

impl Iterator for Prbs {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_bit())
    }
}

/// Per-frame table of line seeds.
///
/// Entry `n` is the frame seed advanced `n × steps_per_line` times. The
/// table is computed once per decoder and shared read-only by all lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTable {
    seeds: Vec<u16>,
}

impl SeedTable {
    /// Builds a table of `lines` seeds.
    pub fn new(seed: u16, steps_per_line: usize, lines: usize) -> Self {
        let mut seeds = Vec::with_capacity(lines);
        let mut prbs = Prbs::new(seed);

        for _ in 0..lines {
            seeds.push(prbs.state());
            prbs.discard(steps_per_line);
        }

        Self { seeds }
    }

    /// Builds the table described by a signal configuration.
    pub fn from_config(config: &SignalConfig) -> Self {
        Self::new(
            config.prbs_seed,
            config.prbs_steps_per_line,
            config.lines_per_frame,
        )
    }

    /// Returns the seed of frame line `index` (0 = first frame line).
    #[inline]
    pub fn seed_for_line(&self, index: usize) -> Option<u16> {
        self.seeds.get(index).copied()
    }

    /// Returns a generator positioned at the start of frame line `index`.
    pub fn generator(&self, index: usize) -> Option<Prbs> {
        self.seed_for_line(index).map(Prbs::new)
    }

    /// Number of lines covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Returns true if the table holds no seeds.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}

impl Default for SeedTable {
    fn default() -> Self {
        Self::from_config(&SignalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_advance_from_reference_seed() {
        let mut state = PRBS_SEED;
        let bits: Vec<u8> = (0..16).map(|_| advance(&mut state)).collect();

        assert_eq!(bits, [0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 0]);
        assert_eq!(state, 0x1555);
    }

    #[test]
    fn test_reference_line_seeds() {
        let table = SeedTable::default();

        assert_eq!(table.len(), 625);
        assert_eq!(table.seed_for_line(0), Some(0x7FFF));
        assert_eq!(table.seed_for_line(1), Some(0x2E97));
        assert_eq!(table.seed_for_line(2), Some(0x6935));
        assert_eq!(table.seed_for_line(3), Some(0x7454));
        assert_eq!(table.seed_for_line(100), Some(0x4035));
        assert_eq!(table.seed_for_line(624), Some(0x7902));
        assert_eq!(table.seed_for_line(625), None);
    }

    #[test]
    fn test_seed_matches_direct_stepping() {
        let table = SeedTable::default();

        for line in [0usize, 1, 7, 311, 624] {
            let mut prbs = Prbs::new(PRBS_SEED);
            prbs.discard(648 * line);
            assert_eq!(table.seed_for_line(line), Some(prbs.state()), "line {line}");
        }
    }

    #[test]
    fn test_line_generator_sequence() {
        let table = SeedTable::default();
        let bits: Vec<u8> = table.generator(1).unwrap().take(16).collect();

        assert_eq!(bits, [1, 0, 1, 1, 0, 0, 0, 1, 1, 0, 1, 0, 0, 1, 1, 0]);
    }

    #[test]
    fn test_register_stays_fifteen_bits() {
        let mut prbs = Prbs::new(0xFFFF);
        for _ in 0..10_000 {
            prbs.next_bit();
            assert!(prbs.state() <= 0x7FFF);
        }
    }

    proptest! {
        #[test]
        fn test_descramble_is_involution(
            bits in proptest::collection::vec(0u8..=1, 0..400),
            seed in 1u16..=0x7FFF,
        ) {
            let mut data = bits.clone();
            Prbs::new(seed).apply(&mut data);
            Prbs::new(seed).apply(&mut data);
            prop_assert_eq!(data, bits);
        }
    }
}
