// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;

use v4l::Device;
use v4l::buffer::{Flags as BufferFlags, Metadata, Type};
use v4l::capability::Flags as CapabilityFlags;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::{CaptureStream, Stream};
use v4l::video::Capture;

use crate::core::nodes::names;
use crate::core::{
    AccessMode, Camera, DeviceInfo, NodeMap, PixelFormat, RawFrame, RecorderError, Result,
};

const BUFFER_COUNT: u32 = 4;

/// Geometry captured when streaming starts.
#[derive(Debug, Clone, Copy)]
struct CaptureFormat {
    format: PixelFormat,
    width: u32,
    height: u32,
    stride: usize,
}

/// A V4L2 capture device.
///
/// Width and height map onto the driver format, the frame rate onto the
/// streaming parameters. V4L2 has no binning controls, so the binning nodes
/// report `NotAvailable`. Acquisition is always continuous.
pub struct V4lCamera {
    info: DeviceInfo,
    path: PathBuf,
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    capture: Option<CaptureFormat>,
    next_frame_id: u64,
    outstanding: Option<u64>,
}

impl V4lCamera {
    pub(super) fn open(info: DeviceInfo, path: PathBuf) -> Result<Self> {
        Ok(Self {
            info,
            path,
            device: None,
            stream: None,
            capture: None,
            next_frame_id: 0,
            outstanding: None,
        })
    }

    fn device(&self) -> Result<&Device> {
        self.device.as_ref().ok_or_else(|| {
            RecorderError::Device(format!("{} is not initialized", self.path.display()))
        })
    }

    fn device_error(&self, what: &str, e: std::io::Error) -> RecorderError {
        RecorderError::Device(format!("{} on {}: {}", what, self.path.display(), e))
    }

    fn set_dimension(&mut self, node: &str, value: i64) -> Result<()> {
        if self.stream.is_some() {
            return Err(RecorderError::node_access(node, "cannot change while streaming"));
        }
        let value = u32::try_from(value)
            .map_err(|_| RecorderError::node_access(node, format!("rejects value {}", value)))?;

        let dev = self.device()?;
        let mut format = dev
            .format()
            .map_err(|e| self.device_error("VIDIOC_G_FMT", e))?;
        if node == names::WIDTH {
            format.width = value;
        } else {
            format.height = value;
        }
        let actual = dev
            .set_format(&format)
            .map_err(|e| self.device_error("VIDIOC_S_FMT", e))?;

        let got = if node == names::WIDTH {
            actual.width
        } else {
            actual.height
        };
        if got != value {
            tracing::warn!("{}: requested {}, driver selected {}", node, value, got);
        }
        Ok(())
    }
}

impl Camera for V4lCamera {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn init(&mut self) -> Result<()> {
        let device = Device::with_path(&self.path).map_err(|e| self.device_error("open", e))?;
        let caps = device
            .query_caps()
            .map_err(|e| self.device_error("VIDIOC_QUERYCAP", e))?;
        if !caps.capabilities.contains(CapabilityFlags::STREAMING) {
            return Err(RecorderError::Device(format!(
                "{} does not support streaming I/O",
                self.path.display()
            )));
        }
        tracing::debug!(
            "Opened {} (driver {}, card {})",
            self.path.display(),
            caps.driver,
            caps.card
        );
        self.device = Some(device);
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        self.end_acquisition()?;
        self.device = None;
        Ok(())
    }

    fn node_map(&mut self) -> &mut dyn NodeMap {
        self
    }

    fn begin_acquisition(&mut self) -> Result<()> {
        let dev = self.device()?;
        let format = dev
            .format()
            .map_err(|e| self.device_error("VIDIOC_G_FMT", e))?;
        let pixel_format = PixelFormat::from_fourcc_bytes(format.fourcc.repr);
        if pixel_format == PixelFormat::Unknown {
            return Err(RecorderError::Device(format!(
                "unsupported pixel format {}",
                format.fourcc
            )));
        }

        // No dequeue timeout: a stalled device blocks until it delivers.
        let stream = MmapStream::with_buffers(dev, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|e| self.device_error("VIDIOC_REQBUFS", e))?;

        tracing::info!(
            "Streaming {}x{} {} from {}",
            format.width,
            format.height,
            pixel_format,
            self.path.display()
        );
        self.capture = Some(CaptureFormat {
            format: pixel_format,
            width: format.width,
            height: format.height,
            stride: format.stride as usize,
        });
        self.stream = Some(stream);
        Ok(())
    }

    fn end_acquisition(&mut self) -> Result<()> {
        self.outstanding = None;
        self.capture = None;
        if let Some(mut stream) = self.stream.take() {
            stream
                .stop()
                .map_err(|e| self.device_error("VIDIOC_STREAMOFF", e))?;
        }
        Ok(())
    }

    fn next_frame(&mut self) -> Result<RawFrame> {
        if let Some(id) = self.outstanding {
            return Err(RecorderError::FrameNotReleased(id));
        }
        let capture = self
            .capture
            .ok_or_else(|| RecorderError::Device("acquisition has not started".into()))?;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| RecorderError::Device("acquisition has not started".into()))?;

        let frame_id = self.next_frame_id;
        let frame = match stream.next() {
            Ok((buf, meta)) => build_frame(frame_id, &capture, buf, meta),
            Err(e) => {
                return Err(RecorderError::Device(format!(
                    "VIDIOC_DQBUF on {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        self.next_frame_id += 1;
        self.outstanding = Some(frame_id);
        Ok(frame)
    }

    fn release_frame(&mut self, frame_id: u64) -> Result<()> {
        // The mmap stream re-queues the buffer on the next dequeue; the pixels
        // were already copied out.
        match self.outstanding {
            Some(id) if id == frame_id => {
                self.outstanding = None;
                Ok(())
            }
            _ => Err(RecorderError::Device(format!(
                "frame {} is not outstanding",
                frame_id
            ))),
        }
    }
}

impl NodeMap for V4lCamera {
    fn access(&self, node: &str) -> AccessMode {
        if self.device.is_none() {
            return AccessMode::NotAvailable;
        }
        match node {
            names::WIDTH | names::HEIGHT if self.stream.is_some() => AccessMode::ReadOnly,
            names::WIDTH | names::HEIGHT | names::ACQUISITION_MODE => AccessMode::ReadWrite,
            names::ACQUISITION_FRAME_RATE | names::DEVICE_MODEL_NAME => AccessMode::ReadOnly,
            _ => AccessMode::NotAvailable,
        }
    }

    fn integer(&self, node: &str) -> Result<i64> {
        let format = match node {
            names::WIDTH | names::HEIGHT => self
                .device()?
                .format()
                .map_err(|e| self.device_error("VIDIOC_G_FMT", e))?,
            _ => {
                return Err(RecorderError::NodeUnavailable {
                    node: node.to_string(),
                });
            }
        };
        Ok(if node == names::WIDTH {
            format.width as i64
        } else {
            format.height as i64
        })
    }

    fn set_integer(&mut self, node: &str, value: i64) -> Result<()> {
        match node {
            names::WIDTH | names::HEIGHT => self.set_dimension(node, value),
            _ => Err(RecorderError::NodeUnavailable {
                node: node.to_string(),
            }),
        }
    }

    fn float(&self, node: &str) -> Result<f64> {
        if node != names::ACQUISITION_FRAME_RATE {
            return Err(RecorderError::NodeUnavailable {
                node: node.to_string(),
            });
        }
        let params = self
            .device()?
            .params()
            .map_err(|e| self.device_error("VIDIOC_G_PARM", e))?;
        fps_from_interval(params.interval.numerator, params.interval.denominator).ok_or_else(
            || {
                RecorderError::node_access(
                    node,
                    format!(
                        "reports an invalid frame interval {}/{}",
                        params.interval.numerator, params.interval.denominator
                    ),
                )
            },
        )
    }

    fn enumeration(&self, node: &str) -> Result<String> {
        if node == names::ACQUISITION_MODE && self.device.is_some() {
            return Ok(names::CONTINUOUS.to_string());
        }
        Err(RecorderError::NodeUnavailable {
            node: node.to_string(),
        })
    }

    fn enum_entry_access(&self, node: &str, entry: &str) -> AccessMode {
        if node == names::ACQUISITION_MODE && entry == names::CONTINUOUS && self.device.is_some() {
            AccessMode::ReadOnly
        } else {
            AccessMode::NotAvailable
        }
    }

    fn set_enumeration(&mut self, node: &str, entry: &str) -> Result<()> {
        match (node, entry) {
            (names::ACQUISITION_MODE, names::CONTINUOUS) => Ok(()),
            (names::ACQUISITION_MODE, _) => Err(RecorderError::node_access(
                node,
                format!("has no entry '{}'", entry),
            )),
            _ => Err(RecorderError::NodeUnavailable {
                node: node.to_string(),
            }),
        }
    }

    fn string(&self, node: &str) -> Result<String> {
        if node == names::DEVICE_MODEL_NAME {
            return Ok(self.info.model.clone());
        }
        Err(RecorderError::NodeUnavailable {
            node: node.to_string(),
        })
    }
}

impl Drop for V4lCamera {
    fn drop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                tracing::warn!("Failed to stop stream on {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Frames per second for a V4L2 frame interval (seconds per frame).
fn fps_from_interval(numerator: u32, denominator: u32) -> Option<f64> {
    if numerator == 0 || denominator == 0 {
        return None;
    }
    Some(denominator as f64 / numerator as f64)
}

/// A JPEG buffer is complete when it starts with SOI and ends with EOI,
/// ignoring zero padding some drivers append.
fn is_complete_jpeg(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    let data = &data[..end];
    data.starts_with(&[0xFF, 0xD8]) && data.ends_with(&[0xFF, 0xD9])
}

fn build_frame(frame_id: u64, capture: &CaptureFormat, buf: &[u8], meta: &Metadata) -> RawFrame {
    let used = (meta.bytesused as usize).min(buf.len());
    let data = buf[..used].to_vec();
    let timestamp_ns =
        meta.timestamp.sec as i64 * 1_000_000_000 + meta.timestamp.usec as i64 * 1_000;

    let mut frame = RawFrame::packed(
        frame_id,
        capture.format,
        capture.width,
        capture.height,
        data,
    )
    .with_timestamp(timestamp_ns);

    let mut complete = !meta.flags.contains(BufferFlags::ERROR);
    match capture.format.bytes_per_pixel() {
        Some(bpp) => {
            let padded_width = (capture.stride / bpp) as u32;
            frame = frame.with_padding(padded_width.saturating_sub(capture.width), 0);
            complete &= frame.expected_len().is_some_and(|len| used >= len);
        }
        None => complete &= is_complete_jpeg(&frame.data),
    }

    if complete {
        frame
    } else {
        tracing::debug!(
            "Frame {} incomplete ({} bytes, flags {:?})",
            frame_id,
            used,
            meta.flags
        );
        frame.mark_incomplete()
    }
}
