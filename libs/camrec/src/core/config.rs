// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Recorder configuration, optionally loaded from a TOML file.
//!
//! Defaults reproduce the fixed recording policy: camera 0, 2x2 binning of a
//! 1440x1080 sensor, continuous acquisition, at most 10000 frames, MJPEG at
//! quality 99 capped at 2048 MB per file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{RecorderError, Result};

/// Device selection and the values pushed into its node map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Index into the enumerated camera list.
    pub index: usize,
    /// Horizontal and vertical binning factor.
    pub binning: u32,
    /// Full sensor width in pixels, before binning.
    pub sensor_width: u32,
    /// Full sensor height in pixels, before binning.
    pub sensor_height: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            index: 0,
            binning: 2,
            sensor_width: 1440,
            sensor_height: 1080,
        }
    }
}

impl DeviceConfig {
    /// Output width after binning.
    pub fn binned_width(&self) -> u32 {
        self.sensor_width / self.binning.max(1)
    }

    /// Output height after binning.
    pub fn binned_height(&self) -> u32 {
        self.sensor_height / self.binning.max(1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Upper bound on loop iterations (delivered plus incomplete frames).
    pub max_frames: u64,
    /// Key poll wait after each preview update, in milliseconds.
    pub key_wait_ms: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_frames: 10_000,
            key_wait_ms: 1,
        }
    }
}

impl AcquisitionConfig {
    pub fn key_wait(&self) -> Duration {
        Duration::from_millis(self.key_wait_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Size cap per output file, in megabytes.
    pub max_file_size_mb: u32,
    /// JPEG quality, 1-100.
    pub quality: u8,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 2048,
            quality: 99,
        }
    }
}

impl VideoConfig {
    /// Largest value whose byte count still fits a RIFF size field.
    pub const MAX_FILE_SIZE_MB: u32 = 4095;

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb as u64 * 1024 * 1024
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the preview window. Headless runs never see a key and stop at the frame limit.
    pub enabled: bool,
    pub window_title: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_title: "camrec".to_string(),
        }
    }
}

/// Complete recorder configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    pub device: DeviceConfig,
    pub acquisition: AcquisitionConfig,
    pub video: VideoConfig,
    pub display: DisplayConfig,
}

impl RecorderConfig {
    /// Load and validate a TOML configuration file. Missing keys take their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RecorderError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            RecorderError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        tracing::info!("Loaded recorder config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.binning == 0 {
            return Err(RecorderError::Configuration(
                "device.binning must be at least 1".into(),
            ));
        }
        if self.device.binned_width() == 0 || self.device.binned_height() == 0 {
            return Err(RecorderError::Configuration(format!(
                "binning {} leaves no pixels of a {}x{} sensor",
                self.device.binning, self.device.sensor_width, self.device.sensor_height
            )));
        }
        if !(1..=100).contains(&self.video.quality) {
            return Err(RecorderError::Configuration(format!(
                "video.quality must be within 1..=100, got {}",
                self.video.quality
            )));
        }
        if self.video.max_file_size_mb == 0
            || self.video.max_file_size_mb > VideoConfig::MAX_FILE_SIZE_MB
        {
            return Err(RecorderError::Configuration(format!(
                "video.max_file_size_mb must be within 1..={}, got {}",
                VideoConfig::MAX_FILE_SIZE_MB,
                self.video.max_file_size_mb
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_recording_policy() {
        let config = RecorderConfig::default();
        assert_eq!(config.device.index, 0);
        assert_eq!(config.device.binned_width(), 720);
        assert_eq!(config.device.binned_height(), 540);
        assert_eq!(config.acquisition.max_frames, 10_000);
        assert_eq!(config.acquisition.key_wait(), Duration::from_millis(1));
        assert_eq!(config.video.quality, 99);
        assert_eq!(config.video.max_file_size_bytes(), 2048 * 1024 * 1024);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camrec.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[device]\nbinning = 1\n\n[acquisition]\nmax_frames = 42").unwrap();

        let config = RecorderConfig::load(&path).unwrap();
        assert_eq!(config.device.binning, 1);
        assert_eq!(config.device.binned_width(), 1440);
        assert_eq!(config.acquisition.max_frames, 42);
        assert_eq!(config.video, VideoConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camrec.toml");
        std::fs::write(&path, "[video]\nquality = 0\n").unwrap();

        let err = RecorderConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("video.quality"));
    }

    #[test]
    fn test_load_headless_display() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camrec.toml");
        std::fs::write(&path, "[display]\nenabled = false\n").unwrap();

        let config = RecorderConfig::load(&path).unwrap();
        assert!(!config.display.enabled);
        assert_eq!(config.display.window_title, "camrec");
    }

    #[test]
    fn test_load_missing_file() {
        let err = RecorderConfig::load(Path::new("/nonexistent/camrec.toml")).unwrap_err();
        assert!(matches!(err, RecorderError::Configuration(_)));
    }

    #[test]
    fn test_file_size_cap_fits_riff() {
        let mut config = RecorderConfig::default();
        config.video.max_file_size_mb = 4096;
        assert!(config.validate().is_err());
        config.video.max_file_size_mb = VideoConfig::MAX_FILE_SIZE_MB;
        assert!(config.validate().is_ok());
        assert!(config.video.max_file_size_bytes() <= u32::MAX as u64);
    }
}
