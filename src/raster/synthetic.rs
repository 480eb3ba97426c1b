//! Synthetic frame generation.
//!
//! Models the transmitter end to end so that frames with known contents
//! can be decoded: packet lanes are interleaved, concatenated, scrambled
//! line by line and drawn as black/white symbols behind a sync word.

use super::LumaRaster;
use crate::config::{SignalConfig, SYNC_WORD_BITS};
use crate::frame::{BitReader, BitWriter, Bitstream};
use crate::line::{self, SymbolClock, SyncPolarity};
use crate::packet::{interleave, pack_lanes};
use crate::scrambler::{Prbs, SeedTable};

/// Header and payload of one packet to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketFields {
    /// 10-bit packet address.
    pub address: u16,
    /// 2-bit continuity index.
    pub continuity: u8,
    /// 11 header bits following the continuity index.
    pub protection: u16,
    /// Payload bytes, sent least significant bit first.
    pub payload: Vec<u8>,
}

/// Errors raised while rendering a synthetic frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntheticError {
    /// Packet count differs from the frame's.
    #[error("frame carries {expected} packets, {actual} given")]
    PacketCount {
        /// Packets per frame.
        expected: usize,
        /// Packets supplied.
        actual: usize,
    },
    /// A payload has the wrong length.
    #[error("packet {index}: payload of {actual} bytes, expected {expected}")]
    PayloadLength {
        /// Packet index in the frame.
        index: usize,
        /// Payload bytes per packet.
        expected: usize,
        /// Payload bytes supplied.
        actual: usize,
    },
    /// A header field does not fit its bit width.
    #[error("packet {index}: header field out of range")]
    FieldRange {
        /// Packet index in the frame.
        index: usize,
    },
}

/// Renders packets into a raster the way a D2-MAC transmitter would.
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    /// Signal model shared with the decoder.
    pub config: SignalConfig,
    /// Symbols of background before the sync word on every line.
    pub lead_symbols: usize,
    /// Per-line sync column jitter, in samples.
    pub jitter: usize,
    /// Intensity outside the sync word and data.
    pub background: u8,
    /// Data lines drawn without sync word or data.
    pub blank_lines: Vec<usize>,
    /// Background rows appended below the frame.
    pub extra_rows: usize,
}

impl Default for SyntheticFrame {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}

impl SyntheticFrame {
    /// Creates a renderer with the default layout for `config`.
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            lead_symbols: 10,
            jitter: 4,
            background: 0x80,
            blank_lines: Vec::new(),
            extra_rows: 0,
        }
    }

    fn clock(&self) -> SymbolClock {
        SymbolClock::from_config(&self.config)
    }

    /// Column of the first sync sample on data line `line`.
    pub fn sync_column(&self, line: usize) -> usize {
        self.clock().symbol_start(self.lead_symbols) + line % (self.jitter + 1)
    }

    /// Raster width.
    pub fn width(&self) -> usize {
        let clock = self.clock();
        let end = clock.symbol_start(
            self.lead_symbols + SYNC_WORD_BITS + self.config.bits_per_data_line + 4,
        );
        (end + self.jitter).max(line::min_width(&self.config))
    }

    /// Raster height.
    pub fn height(&self) -> usize {
        self.config.min_height() + self.extra_rows
    }

    fn check(&self, packets: &[PacketFields]) -> Result<(), SyntheticError> {
        if packets.len() != self.config.packets_per_frame {
            return Err(SyntheticError::PacketCount {
                expected: self.config.packets_per_frame,
                actual: packets.len(),
            });
        }

        let payload_len = self
            .config
            .bits_per_transmission_line
            .saturating_sub(crate::packet::HEADER_BITS)
            / 8;
        for (index, packet) in packets.iter().enumerate() {
            if packet.payload.len() != payload_len {
                return Err(SyntheticError::PayloadLength {
                    index,
                    expected: payload_len,
                    actual: packet.payload.len(),
                });
            }
            if packet.address > 0x3FF || packet.continuity > 0x03 || packet.protection > 0x7FF {
                return Err(SyntheticError::FieldRange { index });
            }
        }
        Ok(())
    }

    /// Builds the unscrambled frame bitstream for `packets`.
    pub fn frame_bits(&self, packets: &[PacketFields]) -> Result<Bitstream, SyntheticError> {
        self.check(packets)?;

        let bits = self.config.bits_per_transmission_line;
        let mut writer = BitWriter::with_capacity(self.config.frame_packet_bits());

        for packet in packets {
            let lanes = pack_lanes(
                packet.address,
                packet.continuity,
                packet.protection,
                &packet.payload,
                self.config.bytes_per_packet,
            );
            let sent = interleave(&lanes, bits);
            let mut reader = BitReader::new(&sent, bits);
            while let Some(bit) = reader.read_bit() {
                writer.write_bit(bit);
            }
        }

        Ok(writer.finish())
    }

    /// Renders one frame carrying `packets`.
    pub fn render(&self, packets: &[PacketFields]) -> Result<LumaRaster, SyntheticError> {
        let stream = self.frame_bits(packets)?;
        let clock = self.clock();
        let seeds = SeedTable::from_config(&self.config);

        let width = self.width();
        let height = self.height();
        let os = self.config.oversampling_factor as usize;
        let per_line = self.config.bits_per_data_line;
        let placeholders = self.config.placeholder_lines();
        let lines = self
            .config
            .lines_in_height(height)
            .min(self.config.data_lines_available());

        let mut raster = LumaRaster::filled(width, height, self.background);

        for line in 0..lines {
            if self.blank_lines.contains(&line) {
                continue;
            }

            let frame_line = placeholders + line;
            let mut prbs = seeds
                .generator(frame_line)
                .unwrap_or_else(|| Prbs::new(self.config.prbs_seed));
            let polarity = if line % 2 == 0 {
                SyncPolarity::Normal
            } else {
                SyncPolarity::Inverted
            };

            let mut symbols = Vec::with_capacity(SYNC_WORD_BITS + per_line);
            symbols.extend((0..SYNC_WORD_BITS).map(|i| (polarity.word() >> i) & 1));
            symbols.extend((0..per_line).map(|i| {
                let bit = stream.bit(frame_line * per_line + i).unwrap_or(0);
                bit ^ prbs.next_bit()
            }));

            let column = self.sync_column(line);
            for row in (line * os..(line + 1) * os).take_while(|&row| row < height) {
                let samples = raster.row_mut(row);
                for (i, &bit) in symbols.iter().enumerate() {
                    let level = if bit == 1 { 0xFF } else { 0x00 };
                    let start = column + clock.symbol_start(i);
                    let end = (column + clock.symbol_start(i + 1)).min(width);
                    samples[start..end].fill(level);
                }
            }
        }

        tracing::debug!(width, height, lines, "rendered synthetic frame");
        Ok(raster)
    }
}
