//! Sampled video input.
//!
//! The decoder reads a rectangular grid of single-channel intensities, one
//! raster row per video line (or per oversampled sub-line). Loading that
//! grid from an image or capture format is left to the caller; this module
//! only defines the read interface, an owned grid, and a synthetic
//! transmitter used to produce known-good frames.

mod grid;
mod synthetic;

pub use grid::{LumaRaster, Raster, RasterError};
pub use synthetic::{PacketFields, SyntheticError, SyntheticFrame};
