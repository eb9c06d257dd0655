// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! camrec CLI
//!
//! Records one camera to an MJPEG/AVI file with a live preview.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

mod record;

#[derive(Parser, Debug)]
#[command(name = "camrec")]
#[command(author, version, about = "Record a camera to MJPEG/AVI", long_about = None)]
struct Cli {
    /// Output video file (continuation files are numbered after it)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Recorder configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many frames (overrides acquisition.max_frames)
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,

    /// Camera to record from (overrides device.index)
    #[arg(long, value_name = "N")]
    device_index: Option<usize>,

    /// Record without the preview window
    #[arg(long)]
    no_preview: bool,
}

fn main() -> Result<()> {
    // Parse before anything else so a usage error never reaches a device.
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = record::build_config(&cli)?;
    let summary = record::run(&cli.output, &config)?;

    println!(
        "Recorded {} frames to {} ({} incomplete skipped, {:.2} fps, {}x{})",
        summary.stats.frames_written,
        cli.output.display(),
        summary.stats.frames_incomplete,
        summary.settings.frame_rate,
        summary.settings.width,
        summary.settings.height
    );
    Ok(())
}
