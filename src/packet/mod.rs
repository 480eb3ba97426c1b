//! Packet splitting and header parsing.
//!
//! The frame bitstream is cut into fixed-length packets, each packed into
//! a buffer of byte lanes and deinterleaved. A deinterleaved packet starts
//! with a 23-bit header:
//!
//! ```text
//! bits  0..10   address
//! bits 10..12   continuity
//! bits 12..23   protection (sent raw, not corrected here)
//! bits 23..     payload
//! ```

mod interleave;

pub use interleave::{deinterleave, interleave};

use crate::config::SignalConfig;
use crate::frame::{BitWriter, Bitstream};

/// Address field width.
pub const ADDRESS_BITS: usize = 10;

/// Continuity field width.
pub const CONTINUITY_BITS: usize = 2;

/// Header protection field width.
pub const PROTECTION_BITS: usize = 11;

/// Header bits preceding the payload.
pub const HEADER_BITS: usize = ADDRESS_BITS + CONTINUITY_BITS + PROTECTION_BITS;

/// A deinterleaved packet.
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    index: usize,
    lanes: Vec<u8>,
    address: u16,
    continuity: u8,
    protection: u16,
    payload: Vec<u8>,
}

impl Packet {
    /// Parses deinterleaved lanes of a `bits`-bit packet.
    pub fn from_lanes(index: usize, lanes: Vec<u8>, bits: usize) -> Self {
        let lane = |i: usize| lanes.get(i).copied().unwrap_or(0);

        let address = u16::from(lane(1) & 0x03) << 8 | u16::from(lane(0));
        let continuity = (lane(1) >> 2) & 0x03;
        let protection = u16::from(lane(1) >> 4) | u16::from(lane(2) & 0x7F) << 4;

        // Payload bytes straddle lane boundaries by one bit.
        let payload = (0..bits.saturating_sub(HEADER_BITS) / 8)
            .map(|k| (lane(2 + k) >> 7) | (lane(3 + k) << 1))
            .collect();

        Self {
            index,
            lanes,
            address,
            continuity,
            protection,
            payload,
        }
    }

    /// Position of the packet in its frame.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Packet address, 0..=1023.
    #[inline]
    pub fn address(&self) -> u16 {
        self.address
    }

    /// Continuity counter, 0..=3.
    #[inline]
    pub fn continuity(&self) -> u8 {
        self.continuity
    }

    /// Raw 11-bit header protection field.
    #[inline]
    pub fn protection(&self) -> u16 {
        self.protection
    }

    /// Payload bytes following the header.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deinterleaved byte lanes the fields were read from.
    #[inline]
    pub fn lanes(&self) -> &[u8] {
        &self.lanes
    }
}

impl std::fmt::Debug for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packet")
            .field("index", &self.index)
            .field("address", &self.address)
            .field("continuity", &self.continuity)
            .field("payload_bytes", &self.payload.len())
            .finish()
    }
}

/// Builds the deinterleaved lanes of a packet, the layout [`Packet::from_lanes`] reads.
pub fn pack_lanes(
    address: u16,
    continuity: u8,
    protection: u16,
    payload: &[u8],
    lanes: usize,
) -> Vec<u8> {
    let mut writer = BitWriter::with_capacity(lanes * 8);
    writer.write_bits_lsb(u64::from(address), ADDRESS_BITS);
    writer.write_bits_lsb(u64::from(continuity), CONTINUITY_BITS);
    writer.write_bits_lsb(u64::from(protection), PROTECTION_BITS);
    for &byte in payload {
        writer.write_bits_lsb(u64::from(byte), 8);
    }

    let mut out = writer.finish().bytes().to_vec();
    out.resize(lanes, 0);
    out
}

/// Splitting errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    /// Fewer bits than a frame of packets needs.
    #[error("bitstream holds {available} bits, {required} needed for a frame of packets")]
    ShortBitstream {
        /// Bits in the frame bitstream.
        available: usize,
        /// Bits a frame of packets needs.
        required: usize,
    },
}

/// Cuts a frame bitstream into deinterleaved packets.
#[derive(Debug, Clone)]
pub struct PacketSplitter {
    bits_per_packet: usize,
    bytes_per_packet: usize,
    packets_per_frame: usize,
}

impl PacketSplitter {
    /// Creates a splitter for the configured packet geometry.
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            bits_per_packet: config.bits_per_transmission_line,
            bytes_per_packet: config.bytes_per_packet,
            packets_per_frame: config.packets_per_frame,
        }
    }

    /// Payload bytes per packet.
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.bits_per_packet.saturating_sub(HEADER_BITS) / 8
    }

    /// Slices `bitstream` into packets and restores their bit order.
    ///
    /// Bits beyond the last packet are ignored.
    pub fn split_and_fix(&self, bitstream: &Bitstream) -> Result<Vec<Packet>, SplitError> {
        let required = self.packets_per_frame * self.bits_per_packet;
        if bitstream.len() < required {
            return Err(SplitError::ShortBitstream {
                available: bitstream.len(),
                required,
            });
        }

        let mut reader = bitstream.reader();
        let mut packets = Vec::with_capacity(self.packets_per_frame);

        for index in 0..self.packets_per_frame {
            let slice = reader
                .read_stream(self.bits_per_packet)
                .ok_or(SplitError::ShortBitstream {
                    available: bitstream.len(),
                    required,
                })?;

            // Fresh zeroed lanes: the bit past the packet must read as zero.
            let mut lanes = slice.bytes().to_vec();
            lanes.resize(self.bytes_per_packet, 0);
            deinterleave(&mut lanes, self.bits_per_packet);

            packets.push(Packet::from_lanes(index, lanes, self.bits_per_packet));
        }

        Ok(packets)
    }
}

impl Default for PacketSplitter {
    fn default() -> Self {
        Self::new(&SignalConfig::default())
    }
}
