//! Box file inspector
//!
//! Walks a `.hive` file frame by frame without opening the box (no lock, no
//! adapters) and prints what it finds. Useful for checking what a box
//! actually carries on disk and where a torn tail starts.

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use coffer::frame::codec::{decode_frame, MIN_FRAME_LEN};
use coffer::frame::crc::read_u32_le;
use coffer::TypeRegistry;

/// Coffer box file inspector
#[derive(Parser, Debug)]
#[command(name = "coffer-dump")]
#[command(about = "Print the frames of a box file")]
#[command(version)]
struct Args {
    /// Path to a .hive file
    file: PathBuf,

    /// Print tombstones as well as live frames
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    let mut bytes = Vec::new();
    if let Err(e) = File::open(&args.file).and_then(|mut f| f.read_to_end(&mut bytes)) {
        eprintln!("cannot read {}: {}", args.file.display(), e);
        return ExitCode::FAILURE;
    }

    // Frames carry no adapter payload knowledge in lazy mode, so an empty
    // registry is enough to walk the file
    let registry = TypeRegistry::new();

    let mut offset: usize = 0;
    let mut live = 0usize;
    let mut tombstones = 0usize;

    while offset < bytes.len() {
        let Some(length) = read_u32_le(&bytes, offset) else {
            break;
        };
        let length = length as usize;
        if (length as u32) < MIN_FRAME_LEN || offset + length > bytes.len() {
            break;
        }

        let frame = match decode_frame(
            &bytes[offset..offset + length],
            &registry,
            None,
            true,
            offset as u64,
        ) {
            Ok(frame) => frame,
            Err(_) => break,
        };

        if frame.is_tombstone() {
            tombstones += 1;
            if args.verbose {
                println!("{:>10}  {:>8}  tombstone  {}", offset, length, frame.key);
            }
        } else {
            live += 1;
            println!("{:>10}  {:>8}  frame      {}", offset, length, frame.key);
        }
        offset += length;
    }

    if offset < bytes.len() {
        tracing::warn!(
            offset,
            trailing = bytes.len() - offset,
            "file has a torn or encrypted tail from this offset"
        );
    }
    tracing::info!(live, tombstones, bytes = bytes.len(), "scan complete");
    ExitCode::SUCCESS
}
