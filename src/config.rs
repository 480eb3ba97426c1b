//! Signal and decoder configuration.
//!
//! Every timing and geometry constant of the multiplex lives in
//! [`SignalConfig`] and is threaded explicitly through the pipeline.
//! The defaults describe the reference D2-MAC capture: one raster row per
//! video line, 20.25 MHz sampling of a 10.125 Mbit/s duobinary stream.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::packet::HEADER_BITS;

/// Bits in the line synchronisation word.
pub const SYNC_WORD_BITS: usize = 6;

/// Timing and geometry of the sampled signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Video lines in one frame (size of the scrambler seed table).
    pub lines_per_frame: usize,
    /// Data bits sampled per line, excluding the sync word.
    pub bits_per_data_line: usize,
    /// Bits carried by one transmitted packet.
    pub bits_per_transmission_line: usize,
    /// Byte lanes of a packet buffer.
    pub bytes_per_packet: usize,
    /// Packets recovered from one frame.
    pub packets_per_frame: usize,
    /// Raster blow-up factor, applied both horizontally and vertically.
    pub oversampling_factor: u32,
    /// Raster sample rate in Hz (before oversampling).
    pub sample_rate: u64,
    /// Data symbol rate in Hz.
    pub symbol_rate: u64,
    /// Frame line number of the first raster line (1-based).
    pub top_line: usize,
    /// Scrambler register value for the first frame line.
    pub prbs_seed: u16,
    /// Scrambler steps separating the seeds of consecutive lines.
    pub prbs_steps_per_line: usize,
    /// Highest intensity classified as negative polarity.
    pub grey_low: u8,
    /// Highest intensity classified as the grey (zero) level.
    pub grey_high: u8,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lines_per_frame: 625,
            bits_per_data_line: 99,
            bits_per_transmission_line: 751,
            bytes_per_packet: 94,
            packets_per_frame: 82,
            oversampling_factor: 1,
            sample_rate: 20_250_000,
            symbol_rate: 10_125_000,
            top_line: 1,
            prbs_seed: 0x7FFF,
            prbs_steps_per_line: 648,
            grey_low: 0x55,
            grey_high: 0xAA,
        }
    }
}

impl SignalConfig {
    /// Creates the reference configuration with a different oversampling factor.
    pub fn with_oversampling(factor: u32) -> Self {
        Self {
            oversampling_factor: factor,
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lines_per_frame == 0
            || self.bits_per_data_line == 0
            || self.packets_per_frame == 0
            || self
                .packets_per_frame
                .checked_mul(self.bits_per_transmission_line)
                .is_none()
        {
            return Err(ConfigError::InvalidFrameGeometry);
        }
        let lane_bits = self.bytes_per_packet.checked_mul(8).unwrap_or(0);
        if self.bits_per_transmission_line < HEADER_BITS
            || self.bits_per_transmission_line >= lane_bits
        {
            return Err(ConfigError::InvalidPacketGeometry {
                bits: self.bits_per_transmission_line,
                bytes: self.bytes_per_packet,
            });
        }
        self.validate_symbol_clock()?;
        if self.grey_low >= self.grey_high {
            return Err(ConfigError::InvalidThresholds {
                low: self.grey_low,
                high: self.grey_high,
            });
        }
        if self.prbs_seed == 0 || self.prbs_seed > 0x7FFF {
            return Err(ConfigError::InvalidSeed(self.prbs_seed));
        }
        if self.top_line == 0 || self.top_line > self.lines_per_frame {
            return Err(ConfigError::InvalidTopLine(self.top_line));
        }
        if self.data_lines_required() > self.data_lines_available() {
            return Err(ConfigError::InsufficientLines {
                required: self.data_lines_required(),
                available: self.data_lines_available(),
            });
        }
        Ok(())
    }

    /// Checks that every sample position of a line fits the clock arithmetic.
    fn validate_symbol_clock(&self) -> Result<(), ConfigError> {
        if self.oversampling_factor == 0 || self.symbol_rate == 0 {
            return Err(ConfigError::InvalidSymbolClock);
        }
        let samples = self
            .sample_rate
            .checked_mul(u64::from(self.oversampling_factor))
            .ok_or(ConfigError::InvalidSymbolClock)?;
        if samples < self.symbol_rate {
            return Err(ConfigError::InvalidSymbolClock);
        }

        // Furthest half-symbol position sampled on a line.
        let last_position = (SYNC_WORD_BITS as u64)
            .checked_add(self.bits_per_data_line as u64)
            .and_then(|symbols| symbols.checked_mul(2))
            .and_then(|halves| halves.checked_add(1))
            .ok_or(ConfigError::InvalidSymbolClock)?;
        let span = last_position
            .checked_mul(samples)
            .ok_or(ConfigError::InvalidSymbolClock)?;
        if usize::try_from(span).is_err() || self.symbol_rate.checked_mul(2).is_none() {
            return Err(ConfigError::InvalidSymbolClock);
        }
        Ok(())
    }

    /// Lines above the raster that are packed as zero bits.
    #[inline]
    pub fn placeholder_lines(&self) -> usize {
        self.top_line - 1
    }

    /// Total packet bits in one frame.
    #[inline]
    pub fn frame_packet_bits(&self) -> usize {
        self.packets_per_frame * self.bits_per_transmission_line
    }

    /// Raster lines that must be decoded to fill every packet of a frame.
    pub fn data_lines_required(&self) -> usize {
        self.frame_packet_bits()
            .div_ceil(self.bits_per_data_line)
            .saturating_sub(self.placeholder_lines())
    }

    /// Raster lines that still have a scrambler seed in this frame.
    #[inline]
    pub fn data_lines_available(&self) -> usize {
        self.lines_per_frame - self.placeholder_lines()
    }

    /// Raster row sampled for data line `line` (middle of its band).
    #[inline]
    pub fn row_for_line(&self, line: usize) -> usize {
        let os = self.oversampling_factor as usize;
        line * os + os / 2
    }

    /// Number of data lines whose sampling row lies inside `height` rows.
    pub fn lines_in_height(&self, height: usize) -> usize {
        let os = self.oversampling_factor as usize;
        let first = os / 2;
        if height <= first {
            0
        } else {
            (height - first - 1) / os + 1
        }
    }

    /// Minimum raster height holding every required data line.
    pub fn min_height(&self) -> usize {
        match self.data_lines_required() {
            0 => 0,
            lines => self.row_for_line(lines - 1) + 1,
        }
    }
}

/// How a line without a detected sync word is turned into bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostLinePolicy {
    /// Pack the line as zero bits.
    #[default]
    ZeroFill,
    /// Sample the line at the scan bound anyway.
    BestEffort,
}

/// Decoder behaviour that does not affect the signal model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Worker threads for line decoding (1 decodes on the caller's thread).
    pub threads: usize,
    /// Handling of lines whose sync word was not found.
    pub lost_line_policy: LostLinePolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            lost_line_policy: LostLinePolicy::ZeroFill,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Zero lines, line bits or packets, or a frame too large to address.
    #[error("frame geometry must have non-zero lines, line bits and packets")]
    InvalidFrameGeometry,
    /// Packet bits do not fit the byte lanes.
    #[error("packet of {bits} bits does not fit {bytes} byte lanes with its header")]
    InvalidPacketGeometry {
        /// Bits per transmitted packet.
        bits: usize,
        /// Byte lanes per packet.
        bytes: usize,
    },
    /// Sample and symbol rates give no usable clock.
    #[error("symbol clock must give at least one sample per symbol and fit a line")]
    InvalidSymbolClock,
    /// Grey band bounds out of order.
    #[error("grey thresholds out of order (low {low:#04x}, high {high:#04x})")]
    InvalidThresholds {
        /// Upper bound of the negative band.
        low: u8,
        /// Upper bound of the grey band.
        high: u8,
    },
    /// Scrambler seed is zero or wider than 15 bits.
    #[error("scrambler seed {0:#06x} is not a non-zero 15-bit value")]
    InvalidSeed(u16),
    /// Top line is zero or past the end of the frame.
    #[error("top line {0} outside the frame")]
    InvalidTopLine(usize),
    /// The frame's seed table cannot cover the lines its packets need.
    #[error("frame needs {required} data lines but the seed table leaves {available}")]
    InsufficientLines {
        /// Data lines needed to fill every packet.
        required: usize,
        /// Data lines with a scrambler seed.
        available: usize,
    },
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// Config file is not valid TOML for this format.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Signal timing and geometry.
    #[serde(default)]
    pub signal: SignalConfig,
    /// Decoder behaviour.
    #[serde(default)]
    pub decode: DecodeOptions,
    /// Output destinations.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Where to write Prometheus text metrics after decoding.
    pub metrics_path: Option<PathBuf>,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.signal.validate()?;
        Ok(config)
    }
}
