//! D2-MAC Packet Decoding Library
//!
//! Recovers the digital packet multiplex of a D2-MAC signal from a sampled
//! video raster in which each raster row holds one video line.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! raster → line sync → sampling + descrambling → frame bitstream → packets
//!              ↑                ↑
//!         classifier     scrambler seed table
//! ```
//!
//! # Design Principles
//!
//! - **Bit-exact**: the scrambler, sample timing and deinterleaver must
//!   match the transmitter exactly, so symbol positions use exact ratios
//! - **Line-local failures**: a line without a sync word is reported and
//!   zero-filled, never fatal for the frame
//! - **Structural failures are fatal**: a raster too small for a frame is
//!   rejected before any line is decoded
//! - **No hidden state**: the seed table and all geometry live in the
//!   decoder built from a [`SignalConfig`]
//!
//! # Example
//!
//! ```no_run
//! use d2mac_decode::{FrameDecoder, LumaRaster, SignalConfig};
//!
//! # let (samples, width, height) = (vec![0u8; 256 * 625], 256, 625);
//! let raster = LumaRaster::new(samples, width, height).unwrap();
//! let decoder = FrameDecoder::new(SignalConfig::default()).unwrap();
//!
//! let frame = decoder.decode(&raster).unwrap();
//! for packet in &frame.packets {
//!     println!("{} {}", packet.address(), packet.continuity());
//! }
//! for warning in &frame.warnings {
//!     eprintln!("{warning}");
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod frame;
pub mod line;
pub mod metrics;
pub mod packet;
pub mod raster;
pub mod scrambler;

// Re-export commonly used types at crate root
pub use config::{ConfigError, DecodeOptions, FileConfig, LostLinePolicy, SignalConfig};
pub use frame::{Bitstream, DecodeError, DecodeWarning, DecodedFrame, FrameDecoder, LineReport};
pub use line::{Classifier, LineSync, Polarity, SyncPolarity};
pub use packet::{Packet, PacketSplitter};
pub use raster::{LumaRaster, PacketFields, Raster, SyntheticFrame};
pub use scrambler::{Prbs, SeedTable};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
