//! Data bit sampling and descrambling.

use super::{Classifier, SymbolClock};
use crate::config::SignalConfig;
use crate::frame::{BitWriter, Bitstream};
use crate::raster::Raster;
use crate::scrambler::Prbs;

/// Samples the data bits of one line.
#[derive(Debug, Clone)]
pub struct LineSampler {
    clock: SymbolClock,
    classifier: Classifier,
    config: SignalConfig,
}

impl LineSampler {
    /// Creates a sampler for the configured clock and line length.
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            clock: SymbolClock::from_config(config),
            classifier: Classifier::from_config(config),
            config: config.clone(),
        }
    }

    /// Bits produced per line.
    #[inline]
    pub fn bits_per_line(&self) -> usize {
        self.config.bits_per_data_line
    }

    /// Samples, descrambles and appends the data bits of `line` to `out`.
    ///
    /// `sync_offset` is the offset reported by the synchronizer and `prbs`
    /// must be positioned at the line's seed. Samples falling outside the
    /// raster read as black.
    pub fn sample_into<R: Raster + ?Sized>(
        &self,
        raster: &R,
        line: usize,
        sync_offset: isize,
        prbs: &mut Prbs,
        out: &mut BitWriter,
    ) {
        let row = self.config.row_for_line(line);

        for bit in 0..self.config.bits_per_data_line {
            let x = sync_offset + self.clock.data_offset(bit) as isize;
            let sample = raster.get(x, row).unwrap_or(0);
            out.write_bit(self.classifier.bit(sample) ^ prbs.next_bit());
        }
    }

    /// Samples one line into its own bitstream.
    pub fn sample_line<R: Raster + ?Sized>(
        &self,
        raster: &R,
        line: usize,
        sync_offset: isize,
        mut prbs: Prbs,
    ) -> Bitstream {
        let mut out = BitWriter::with_capacity(self.config.bits_per_data_line);
        self.sample_into(raster, line, sync_offset, &mut prbs, &mut out);
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::LumaRaster;
    use crate::scrambler::PRBS_SEED;

    /// Renders `bits` as two-sample symbols with the first data sample
    /// at `offset + 13`.
    fn render(bits: &[u8], offset: usize) -> LumaRaster {
        let mut raster = LumaRaster::filled(offset + 13 + 2 * bits.len() + 4, 1, 0x80);
        let row = raster.row_mut(0);
        for (i, &bit) in bits.iter().enumerate() {
            let level = if bit == 1 { 0xFF } else { 0x00 };
            row[offset + 12 + 2 * i] = level;
            row[offset + 13 + 2 * i] = level;
        }
        raster
    }

    #[test]
    fn test_samples_and_descrambles() {
        let data: Vec<u8> = (0..99).map(|i| (i % 3 == 0) as u8).collect();

        let mut sent = data.clone();
        Prbs::new(PRBS_SEED).apply(&mut sent);
        let raster = render(&sent, 20);

        let sampler = LineSampler::new(&SignalConfig::default());
        let bits = sampler.sample_line(&raster, 0, 20, Prbs::new(PRBS_SEED));

        assert_eq!(bits.len(), 99);
        assert_eq!(bits.to_bits(), data);
    }

    #[test]
    fn test_half_sample_shift_misaligns() {
        let data: Vec<u8> = (0..99).map(|i| (i % 2) as u8).collect();
        let raster = render(&data, 20);
        let sampler = LineSampler::new(&SignalConfig::default());

        let mut aligned = sampler.sample_line(&raster, 0, 20, Prbs::new(PRBS_SEED)).to_bits();
        Prbs::new(PRBS_SEED).apply(&mut aligned);
        assert_eq!(aligned, data);

        let mut shifted = sampler.sample_line(&raster, 0, 21, Prbs::new(PRBS_SEED)).to_bits();
        Prbs::new(PRBS_SEED).apply(&mut shifted);
        assert_ne!(shifted, data);
    }

    #[test]
    fn test_out_of_range_samples_read_black() {
        let raster = LumaRaster::filled(10, 1, 0xFF);
        let sampler = LineSampler::new(&SignalConfig::default());

        let mut bits = sampler.sample_line(&raster, 0, 100, Prbs::new(PRBS_SEED)).to_bits();
        Prbs::new(PRBS_SEED).apply(&mut bits);
        assert!(bits.iter().all(|&b| b == 0));
    }
}
