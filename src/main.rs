//! D2-MAC packet decoder CLI
//!
//! Decodes one frame from a raw luminance dump (one byte per sample, top
//! row first) and logs the recovered packets.

use clap::Parser;
use d2mac_decode::{
    config::FileConfig,
    metrics::{MetricsError, MetricsRegistry, MetricsSnapshot},
    raster::{RasterError, SyntheticError},
    ConfigError, DecodeError, FrameDecoder, LumaRaster, PacketFields, SyntheticFrame,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "d2mac-decode", version, about = "Recover D2-MAC packets from a sampled video frame")]
struct Args {
    /// Raw 8-bit sample dump, row-major, top row first.
    #[arg(required_unless_present = "synthetic")]
    input: Option<PathBuf>,

    /// Samples per row.
    #[arg(long, required_unless_present = "synthetic")]
    width: Option<usize>,

    /// Number of rows.
    #[arg(long, required_unless_present = "synthetic")]
    height: Option<usize>,

    /// Input holds packed RGB triples; the red channel is decoded.
    #[arg(long)]
    rgb: bool,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads for line decoding.
    #[arg(long)]
    threads: Option<usize>,

    /// Write Prometheus text metrics to this file.
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Decode a generated test frame instead of an input file.
    #[arg(long)]
    synthetic: bool,

    /// Log every packet.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("input needs --width and --height")]
    MissingDimensions,
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Synthetic(#[from] SyntheticError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("D2-MAC decoder v{}", d2mac_decode::VERSION);

    if let Err(e) = run(args) {
        eprintln!("Decoding failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let mut config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.decode.threads = threads;
    }
    if let Some(path) = args.metrics_out.clone() {
        config.output.metrics_path = Some(path);
    }

    let raster = if args.synthetic {
        info!("Decoding a synthetic frame");
        SyntheticFrame::new(config.signal.clone()).render(&demo_packets(&config.signal))?
    } else {
        load_raster(&args)?
    };

    let decoder = FrameDecoder::with_options(config.signal.clone(), config.decode.clone())?;
    let frame = decoder.decode(&raster)?;

    for packet in &frame.packets {
        debug!(
            "Packet {:2}: address {:4}, continuity {}",
            packet.index() + 1,
            packet.address(),
            packet.continuity()
        );
    }
    for warning in &frame.warnings {
        warn!("{}", warning);
    }

    if let Some(path) = &config.output.metrics_path {
        let registry = MetricsRegistry::new()?;
        registry.record(&MetricsSnapshot::from_frame(&frame));
        std::fs::write(path, registry.encode()?).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Metrics written to {}", path.display());
    }

    println!(
        "{} packets from {} lines ({} without sync)",
        frame.packets.len(),
        frame.lines.len(),
        frame.warnings.len()
    );
    Ok(())
}

fn load_raster(args: &Args) -> Result<LumaRaster, CliError> {
    let (Some(path), Some(width), Some(height)) = (&args.input, args.width, args.height) else {
        return Err(CliError::MissingDimensions);
    };

    let bytes = std::fs::read(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;
    info!("Read {} bytes from {}", bytes.len(), path.display());

    let raster = if args.rgb {
        LumaRaster::from_rgb24(&bytes, width, height)?
    } else {
        LumaRaster::new(bytes, width, height)?
    };
    Ok(raster)
}

/// Service, sound and dummy packets with a readable payload.
fn demo_packets(signal: &d2mac_decode::SignalConfig) -> Vec<PacketFields> {
    let payload_len = d2mac_decode::PacketSplitter::new(signal).payload_len();
    let text = b"D2-MAC packet multiplex test frame. ";

    (0..signal.packets_per_frame)
        .map(|i| PacketFields {
            address: [0, 224, 1023][i % 3],
            continuity: (i / 3 % 4) as u8,
            protection: 0,
            payload: text.iter().cycle().skip(i).take(payload_len).copied().collect(),
        })
        .collect()
}
