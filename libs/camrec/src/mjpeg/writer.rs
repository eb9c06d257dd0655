// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Size-capped MJPEG/AVI file writer.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;

use crate::core::{ConvertedFrame, RecorderError, Result, VideoConfig, VideoSink};
use crate::mjpeg::avi::AviWriter;

/// Configuration for [`MjpegWriter`].
#[derive(Clone, Debug, PartialEq)]
pub struct MjpegWriterConfig {
    /// First output file. Continuation files are numbered after it.
    pub output_path: PathBuf,
    /// Playback frame rate, normally the camera's negotiated rate.
    pub frame_rate: f64,
    /// JPEG quality, 1-100.
    pub quality: u8,
    /// Size cap per file, in bytes.
    pub max_file_size: u64,
}

impl MjpegWriterConfig {
    pub fn new(output_path: PathBuf, video: &VideoConfig, frame_rate: f64) -> Self {
        Self {
            output_path,
            frame_rate,
            quality: video.quality,
            max_file_size: video.max_file_size_bytes(),
        }
    }
}

/// Path of the `index`-th file of a recording.
///
/// Index 0 is the requested path; later files get a four-digit suffix on the
/// stem: `run.avi`, `run-0001.avi`, `run-0002.avi`, ...
pub fn segment_path(base: &Path, index: u32) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}-{:04}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}-{:04}", stem, index),
    };
    base.with_file_name(name)
}

/// MJPEG writer that continues in a new file when the size cap is reached.
pub struct MjpegWriter {
    config: MjpegWriterConfig,
    segment: Option<AviWriter<BufWriter<File>>>,
    segments: Vec<PathBuf>,
    dimensions: Option<(u32, u32)>,
    frames_written: u64,
    jpeg: Vec<u8>,
}

impl MjpegWriter {
    /// Create the first output file.
    pub fn open(config: MjpegWriterConfig) -> Result<Self> {
        if !(1..=100).contains(&config.quality) {
            return Err(RecorderError::Configuration(format!(
                "JPEG quality must be within 1..=100, got {}",
                config.quality
            )));
        }
        let mut writer = Self {
            config,
            segment: None,
            segments: Vec::new(),
            dimensions: None,
            frames_written: 0,
            jpeg: Vec::new(),
        };
        writer.start_segment()?;
        tracing::info!(
            "Opened MJPEG writer {} ({:.2} fps, quality {}, max {} MB)",
            writer.config.output_path.display(),
            writer.config.frame_rate,
            writer.config.quality,
            writer.config.max_file_size / (1024 * 1024)
        );
        Ok(writer)
    }

    /// Files created so far, in order.
    pub fn segments(&self) -> &[PathBuf] {
        &self.segments
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn start_segment(&mut self) -> Result<()> {
        let path = segment_path(&self.config.output_path, self.segments.len() as u32);
        let file = File::create(&path).map_err(|e| {
            RecorderError::Encoding(format!("Failed to create {}: {}", path.display(), e))
        })?;
        let mut avi = AviWriter::new(BufWriter::new(file), self.config.frame_rate)?;
        if let Some((width, height)) = self.dimensions {
            avi.set_dimensions(width, height);
        }
        tracing::debug!("Started video file {}", path.display());
        self.segment = Some(avi);
        self.segments.push(path);
        Ok(())
    }

    fn finish_segment(&mut self) -> Result<()> {
        if let Some(avi) = self.segment.take() {
            let frames = avi.frame_count();
            avi.finish()?;
            if let Some(path) = self.segments.last() {
                tracing::info!("Closed video file {} ({} frames)", path.display(), frames);
            }
        }
        Ok(())
    }

    fn encode(&mut self, frame: &ConvertedFrame) -> Result<()> {
        self.jpeg.clear();
        JpegEncoder::new_with_quality(&mut self.jpeg, self.config.quality)
            .encode(
                &frame.to_rgb_packed(),
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| RecorderError::Encoding(format!("frame {}: {}", frame.frame_id, e)))
    }
}

impl VideoSink for MjpegWriter {
    fn append(&mut self, frame: &ConvertedFrame) -> Result<()> {
        match self.dimensions {
            None => {
                self.dimensions = Some((frame.width, frame.height));
                if let Some(avi) = self.segment.as_mut() {
                    avi.set_dimensions(frame.width, frame.height);
                }
            }
            Some((width, height)) if (width, height) != (frame.width, frame.height) => {
                return Err(RecorderError::Encoding(format!(
                    "frame {} is {}x{}, recording is {}x{}",
                    frame.frame_id, frame.width, frame.height, width, height
                )));
            }
            Some(_) => {}
        }

        self.encode(frame)?;

        let needs_rollover = match self.segment.as_ref() {
            None => {
                return Err(RecorderError::Encoding("video writer is closed".into()));
            }
            Some(avi) => {
                let projected = avi.projected_len(self.jpeg.len());
                if projected > self.config.max_file_size && avi.is_empty() {
                    tracing::warn!(
                        "Frame {} alone exceeds the {} byte file cap, writing it anyway",
                        frame.frame_id,
                        self.config.max_file_size
                    );
                }
                projected > self.config.max_file_size && !avi.is_empty()
            }
        };

        if needs_rollover {
            self.finish_segment()?;
            self.start_segment()?;
        }

        if let Some(avi) = self.segment.as_mut() {
            avi.write_frame(&self.jpeg)?;
        }
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.finish_segment()?;
        tracing::info!(
            "Video writer closed: {} frames in {} file(s)",
            self.frames_written,
            self.segments.len()
        );
        Ok(())
    }
}
