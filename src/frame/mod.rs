//! Frame-level decoding.
//!
//! The frame decoder walks every data line of a raster, finds its sync
//! word, samples and descrambles its bits, and concatenates the lines into
//! one bitstream which is then split into packets.
//!
//! Lines are independent given the raster: the scrambler seed of a line
//! depends only on its index. With more than one thread configured, lines
//! are decoded in parallel chunks and joined back in line order.

mod bitstream;
mod report;

pub use bitstream::{BitReader, BitWriter, Bitstream};
pub use report::{DecodeWarning, DecodedFrame, FrameBits, LineReport};

use crate::config::{ConfigError, DecodeOptions, LostLinePolicy, SignalConfig};
use crate::line::{self, LineSampler, LineSync, LineSynchronizer};
use crate::packet::{PacketSplitter, SplitError};
use crate::raster::Raster;
use crate::scrambler::{Prbs, SeedTable};

/// Errors that abort a frame decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The decoder was built from an invalid configuration.
    #[error("invalid signal configuration: {0}")]
    Config(#[from] ConfigError),
    /// Rows are too short to hold a line's sync word and data.
    #[error("raster width {width} is below the {required} samples a line needs")]
    RasterTooNarrow {
        /// Raster width in samples.
        width: usize,
        /// Smallest usable width.
        required: usize,
    },
    /// Too few rows to fill every packet of a frame.
    #[error("raster height {height} is below the {required} rows a frame needs")]
    RasterTooShort {
        /// Raster height in rows.
        height: usize,
        /// Smallest usable height.
        required: usize,
    },
    /// The frame bitstream could not be split into packets.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Decodes rasters into packets.
///
/// Holds the per-session seed table and the line stages; one decoder can
/// be reused for any number of frames.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    config: SignalConfig,
    options: DecodeOptions,
    seeds: SeedTable,
    synchronizer: LineSynchronizer,
    sampler: LineSampler,
    splitter: PacketSplitter,
}

impl FrameDecoder {
    /// Creates a sequential decoder for `config`.
    pub fn new(config: SignalConfig) -> Result<Self, DecodeError> {
        Self::with_options(config, DecodeOptions::default())
    }

    /// Creates a decoder with explicit decode options.
    pub fn with_options(config: SignalConfig, options: DecodeOptions) -> Result<Self, DecodeError> {
        config.validate()?;

        Ok(Self {
            seeds: SeedTable::from_config(&config),
            synchronizer: LineSynchronizer::new(&config),
            sampler: LineSampler::new(&config),
            splitter: PacketSplitter::new(&config),
            config,
            options,
        })
    }

    /// Signal model the decoder was built for.
    #[inline]
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Threading and lost-line handling.
    #[inline]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Scrambler seeds of every frame line.
    #[inline]
    pub fn seeds(&self) -> &SeedTable {
        &self.seeds
    }

    /// Checks the raster dimensions and returns the number of lines to decode.
    fn data_lines<R: Raster + ?Sized>(&self, raster: &R) -> Result<usize, DecodeError> {
        let required_width = line::min_width(&self.config);
        if raster.width() < required_width {
            return Err(DecodeError::RasterTooNarrow {
                width: raster.width(),
                required: required_width,
            });
        }

        let required_height = self.config.min_height();
        if raster.height() < required_height {
            return Err(DecodeError::RasterTooShort {
                height: raster.height(),
                required: required_height,
            });
        }

        Ok(self
            .config
            .lines_in_height(raster.height())
            .min(self.config.data_lines_available()))
    }

    /// Synchronises and samples data line `line`.
    pub fn decode_line<R: Raster + ?Sized>(&self, raster: &R, line: usize) -> (LineReport, Bitstream) {
        let sync = self.synchronizer.find_sync(raster, line);
        let report = LineReport {
            line,
            row: self.config.row_for_line(line),
            sync,
        };

        let bits = match (sync, self.options.lost_line_policy) {
            (LineSync::Lost { .. }, LostLinePolicy::ZeroFill) => {
                Bitstream::zeroed(self.sampler.bits_per_line())
            }
            _ => {
                // Frame line index is bounded by the seed table for every
                // line `data_lines` admits.
                let seed = self
                    .seeds
                    .seed_for_line(self.config.placeholder_lines() + line)
                    .unwrap_or(self.config.prbs_seed);
                self.sampler
                    .sample_line(raster, line, sync.offset(), Prbs::new(seed))
            }
        };

        (report, bits)
    }

    fn decode_lines<R: Raster + Sync + ?Sized>(
        &self,
        raster: &R,
        count: usize,
    ) -> Vec<(LineReport, Bitstream)> {
        let threads = self.options.threads.max(1).min(count.max(1));
        if threads == 1 {
            return (0..count).map(|line| self.decode_line(raster, line)).collect();
        }

        let chunk = count.div_ceil(threads);
        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..count)
                .step_by(chunk)
                .map(|start| {
                    let end = (start + chunk).min(count);
                    scope.spawn(move || {
                        (start..end)
                            .map(|line| self.decode_line(raster, line))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            workers
                .into_iter()
                .flat_map(|worker| {
                    worker
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    /// Decodes every data line into one contiguous bitstream.
    pub fn decode_frame<R: Raster + Sync + ?Sized>(&self, raster: &R) -> Result<FrameBits, DecodeError> {
        let count = self.data_lines(raster)?;
        let per_line = self.config.bits_per_data_line;
        let placeholders = self.config.placeholder_lines();

        let mut writer = BitWriter::with_capacity((placeholders + count) * per_line);
        for line in 0..placeholders {
            tracing::trace!(frame_line = line, "packing placeholder line");
            writer.write_zeros(per_line);
        }

        let mut lines = Vec::with_capacity(count);
        let mut warnings = Vec::new();
        for (report, bits) in self.decode_lines(raster, count) {
            if let LineSync::Lost { fallback_offset } = report.sync {
                tracing::warn!(line = report.line, fallback_offset, "line sync not found");
                warnings.push(DecodeWarning::SyncNotFound {
                    line: report.line,
                    fallback_offset,
                });
            }
            writer.append(&bits);
            lines.push(report);
        }

        Ok(FrameBits {
            bits: writer.finish(),
            lines,
            warnings,
        })
    }

    /// Decodes a raster into its packets.
    pub fn decode<R: Raster + Sync + ?Sized>(&self, raster: &R) -> Result<DecodedFrame, DecodeError> {
        let FrameBits {
            bits,
            lines,
            warnings,
        } = self.decode_frame(raster)?;

        let packets = self.splitter.split_and_fix(&bits)?;
        for packet in &packets {
            tracing::debug!(
                index = packet.index(),
                address = packet.address(),
                continuity = packet.continuity(),
                "packet recovered"
            );
        }

        tracing::info!(
            lines = lines.len(),
            lost = warnings.len(),
            packets = packets.len(),
            "frame decoded"
        );

        Ok(DecodedFrame {
            packets,
            lines,
            warnings,
        })
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        let config = SignalConfig::default();
        Self {
            seeds: SeedTable::from_config(&config),
            synchronizer: LineSynchronizer::new(&config),
            sampler: LineSampler::new(&config),
            splitter: PacketSplitter::new(&config),
            config,
            options: DecodeOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{LumaRaster, PacketFields, SyntheticFrame};

    fn reference_packets() -> Vec<PacketFields> {
        let addresses = [0u16, 224, 1023];
        (0..82)
            .map(|i| {
                let payload = (0..91).map(|b| (i * 7 + b * 13) as u8).collect();
                PacketFields {
                    address: if i < 3 { addresses[i] } else { (i * 37 % 1024) as u16 },
                    continuity: (i % 4) as u8,
                    protection: (i * 101 % 2048) as u16,
                    payload,
                }
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_reference_frame() {
        let packets = reference_packets();
        let raster = SyntheticFrame::default().render(&packets).unwrap();

        let frame = FrameDecoder::default().decode(&raster).unwrap();

        assert_eq!(frame.packets.len(), 82);
        assert!(frame.warnings.is_empty());
        for (decoded, sent) in frame.packets.iter().zip(&packets) {
            assert_eq!(decoded.address(), sent.address);
            assert_eq!(decoded.continuity(), sent.continuity);
            assert_eq!(decoded.protection(), sent.protection);
            assert_eq!(decoded.payload(), &sent.payload[..]);
        }
        assert_eq!(frame.packets[0].address(), 0);
        assert_eq!(frame.packets[1].address(), 224);
        assert_eq!(frame.packets[2].address(), 1023);
    }

    #[test]
    fn test_reports_sync_offsets() {
        let synthetic = SyntheticFrame::default();
        let raster = synthetic.render(&reference_packets()).unwrap();

        let frame = FrameDecoder::default().decode(&raster).unwrap();

        assert_eq!(frame.lines.len(), 623);
        for (line, offset) in frame.sync_offsets().into_iter().enumerate() {
            assert_eq!(offset, Some(synthetic.sync_column(line) as isize - 1));
        }
        assert_eq!(frame.sync_ratio(), 1.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let raster = SyntheticFrame::default()
            .render(&reference_packets())
            .unwrap();

        let sequential = FrameDecoder::default().decode_frame(&raster).unwrap();
        let options = DecodeOptions {
            threads: 4,
            ..Default::default()
        };
        let parallel = FrameDecoder::with_options(SignalConfig::default(), options)
            .unwrap()
            .decode_frame(&raster)
            .unwrap();

        assert_eq!(parallel.bits, sequential.bits);
        assert_eq!(parallel.lines, sequential.lines);
    }

    #[test]
    fn test_lost_line_is_reported_and_zero_filled() {
        let synthetic = SyntheticFrame {
            blank_lines: vec![10],
            ..Default::default()
        };
        let raster = synthetic.render(&reference_packets()).unwrap();

        let decoder = FrameDecoder::default();
        let bits = decoder.decode_frame(&raster).unwrap();
        assert_eq!(
            bits.warnings,
            vec![DecodeWarning::SyncNotFound {
                line: 10,
                fallback_offset: raster.width() as isize - 13
            }]
        );
        assert!((990..1089).all(|i| bits.bits.bit(i) == Some(0)));

        let frame = decoder.decode(&raster).unwrap();
        assert_eq!(frame.packets.len(), 82);
        assert_eq!(frame.lost_lines().collect::<Vec<_>>(), vec![10]);
        assert_eq!(frame.sync_offsets()[10], None);
    }

    #[test]
    fn test_best_effort_samples_lost_line_at_fallback() {
        let synthetic = SyntheticFrame {
            blank_lines: vec![10],
            ..Default::default()
        };
        let raster = synthetic.render(&reference_packets()).unwrap();
        let options = DecodeOptions {
            lost_line_policy: LostLinePolicy::BestEffort,
            ..Default::default()
        };
        let decoder = FrameDecoder::with_options(SignalConfig::default(), options).unwrap();

        let bits = decoder.decode_frame(&raster).unwrap();
        assert_eq!(
            bits.warnings,
            vec![DecodeWarning::SyncNotFound {
                line: 10,
                fallback_offset: raster.width() as isize - 13
            }]
        );

        // Every sample past the fallback offset lies beyond the row and reads
        // as black, so the line descrambles to its own sequence.
        let line_bits: Vec<u8> = (990..1089).map(|i| bits.bits.bit(i).unwrap()).collect();
        let sequence: Vec<u8> = decoder.seeds().generator(10).unwrap().take(99).collect();
        assert_eq!(line_bits, sequence);
        assert!(line_bits.contains(&1));

        let frame = decoder.decode(&raster).unwrap();
        assert_eq!(frame.packets.len(), 82);
        assert_eq!(frame.lost_lines().collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn test_bitstream_length_covers_all_lines() {
        let raster = SyntheticFrame::default()
            .render(&reference_packets())
            .unwrap();

        let bits = FrameDecoder::default().decode_frame(&raster).unwrap();
        assert_eq!(bits.bits.len(), 623 * 99);
    }

    #[test]
    fn test_taller_raster_still_gives_82_packets() {
        let synthetic = SyntheticFrame {
            extra_rows: 40,
            ..Default::default()
        };
        let packets = reference_packets();
        let raster = synthetic.render(&packets).unwrap();

        let frame = FrameDecoder::default().decode(&raster).unwrap();

        assert_eq!(frame.lines.len(), 625);
        assert_eq!(frame.packets.len(), 82);
        assert_eq!(frame.packets[81].payload(), &packets[81].payload[..]);
    }

    #[test]
    fn test_short_raster_is_malformed() {
        let raster = LumaRaster::filled(300, 622, 0x80);

        assert_eq!(
            FrameDecoder::default().decode(&raster).unwrap_err(),
            DecodeError::RasterTooShort {
                height: 622,
                required: 623
            }
        );
    }

    #[test]
    fn test_narrow_raster_is_malformed() {
        let raster = LumaRaster::filled(100, 700, 0x80);

        assert_eq!(
            FrameDecoder::default().decode(&raster).unwrap_err(),
            DecodeError::RasterTooNarrow {
                width: 100,
                required: 209
            }
        );
    }

    #[test]
    fn test_oversampled_frame() {
        let config = SignalConfig::with_oversampling(3);
        let packets = reference_packets();
        let synthetic = SyntheticFrame::new(config.clone());
        let raster = synthetic.render(&packets).unwrap();

        let frame = FrameDecoder::new(config).unwrap().decode(&raster).unwrap();

        assert!(frame.warnings.is_empty());
        for (decoded, sent) in frame.packets.iter().zip(&packets) {
            assert_eq!(decoded.address(), sent.address);
            assert_eq!(decoded.payload(), &sent.payload[..]);
        }
    }

    #[test]
    fn test_placeholder_lines_are_zero() {
        let config = SignalConfig {
            top_line: 3,
            ..Default::default()
        };
        let raster = SyntheticFrame::new(config.clone())
            .render(&reference_packets())
            .unwrap();

        let bits = FrameDecoder::new(config).unwrap().decode_frame(&raster).unwrap();

        assert_eq!(bits.lines.len(), 621);
        assert_eq!(bits.bits.len(), 623 * 99);
        assert!((0..198).all(|i| bits.bits.bit(i) == Some(0)));
    }

    #[test]
    fn test_short_seed_table_rejected_up_front() {
        let config = SignalConfig {
            lines_per_frame: 600,
            ..Default::default()
        };
        assert_eq!(
            FrameDecoder::new(config).unwrap_err(),
            DecodeError::Config(ConfigError::InsufficientLines {
                required: 623,
                available: 600
            })
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SignalConfig {
            oversampling_factor: 0,
            ..Default::default()
        };
        assert_eq!(
            FrameDecoder::new(config).unwrap_err(),
            DecodeError::Config(ConfigError::InvalidSymbolClock)
        );
    }
}
