// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
#[cfg(feature = "preview")]
use camrec::PreviewWindow;
use camrec::{
    ConvertedFrame, DisplayConfig, HeadlessDisplay, KeyPress, MjpegWriter, MjpegWriterConfig,
    PreviewDisplay, Recorder, RecorderConfig, RecordingSummary,
};

use crate::Cli;

/// Preview selected at startup.
enum Preview {
    #[cfg(feature = "preview")]
    Window(PreviewWindow),
    Headless(HeadlessDisplay),
}

impl Preview {
    #[cfg(feature = "preview")]
    fn open(config: &DisplayConfig) -> camrec::Result<Self> {
        if config.enabled {
            PreviewWindow::open(config).map(Self::Window)
        } else {
            tracing::info!("Preview disabled");
            Ok(Self::Headless(HeadlessDisplay::new()))
        }
    }

    #[cfg(not(feature = "preview"))]
    fn open(config: &DisplayConfig) -> camrec::Result<Self> {
        if config.enabled {
            tracing::warn!("Built without the preview feature, recording headless");
        }
        Ok(Self::Headless(HeadlessDisplay::new()))
    }

    #[cfg(test)]
    fn is_headless(&self) -> bool {
        matches!(self, Self::Headless(_))
    }
}

impl PreviewDisplay for Preview {
    fn show(&mut self, frame: &ConvertedFrame) -> camrec::Result<()> {
        match self {
            #[cfg(feature = "preview")]
            Self::Window(window) => window.show(frame),
            Self::Headless(headless) => headless.show(frame),
        }
    }

    fn wait_key(&mut self, timeout: Duration) -> camrec::Result<Option<KeyPress>> {
        match self {
            #[cfg(feature = "preview")]
            Self::Window(window) => window.wait_key(timeout),
            Self::Headless(headless) => headless.wait_key(timeout),
        }
    }
}

/// File configuration (or defaults) with command-line overrides applied.
pub fn build_config(cli: &Cli) -> Result<RecorderConfig> {
    let mut config = match &cli.config {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::default(),
    };

    if let Some(max_frames) = cli.max_frames {
        config.acquisition.max_frames = max_frames;
    }
    if let Some(index) = cli.device_index {
        config.device.index = index;
    }
    if cli.no_preview {
        config.display.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(target_os = "linux")]
pub fn run(output: &Path, config: &RecorderConfig) -> Result<RecordingSummary> {
    let mut recorder = Recorder::new(config);
    recorder
        .run(
            camrec::V4lSystem::new(),
            |settings| {
                MjpegWriter::open(MjpegWriterConfig::new(
                    output.to_path_buf(),
                    &config.video,
                    settings.frame_rate,
                ))
            },
            Preview::open,
        )
        .with_context(|| {
            format!(
                "Recording to {} failed (stopped in state {:?})",
                output.display(),
                recorder.state()
            )
        })
}

#[cfg(not(target_os = "linux"))]
pub fn run(_output: &Path, _config: &RecorderConfig) -> Result<RecordingSummary> {
    anyhow::bail!("No camera backend is available on this platform")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rig.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[acquisition]\nmax_frames = 500\n\n[device]\nindex = 3").unwrap();

        let cli = Cli::try_parse_from([
            "camrec",
            "--config",
            path.to_str().unwrap(),
            "--max-frames",
            "20",
            "--no-preview",
            "out.avi",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();

        assert_eq!(config.acquisition.max_frames, 20);
        assert_eq!(config.device.index, 3);
        assert!(!config.display.enabled);
    }

    #[test]
    fn test_defaults_without_config() {
        let cli = Cli::try_parse_from(["camrec", "out.avi"]).unwrap();
        assert_eq!(build_config(&cli).unwrap(), RecorderConfig::default());
    }

    #[test]
    fn test_disabled_preview_is_headless() {
        let config = DisplayConfig {
            enabled: false,
            ..DisplayConfig::default()
        };
        let mut preview = Preview::open(&config).unwrap();

        assert!(preview.is_headless());
        assert_eq!(preview.wait_key(Duration::from_millis(1)).unwrap(), None);
    }

    #[cfg(not(feature = "preview"))]
    #[test]
    fn test_build_without_preview_is_headless() {
        let preview = Preview::open(&DisplayConfig::default()).unwrap();
        assert!(preview.is_headless());
    }

    #[test]
    fn test_missing_config_file_fails() {
        let cli = Cli::try_parse_from(["camrec", "--config", "/nonexistent/rig.toml", "out.avi"])
            .unwrap();
        let err = build_config(&cli).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
