// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Seams between the recording workflow and the device, display and file
//! backends.

use std::time::Duration;

use crate::core::{ConvertedFrame, NodeMap, RawFrame, Result};

/// Identity of an attached camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Position in the enumerated list.
    pub index: usize,
    /// Vendor model name.
    pub model: String,
    /// Where the device is attached (device node, bus id, serial).
    pub location: String,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.index, self.model, self.location)
    }
}

/// Process-wide camera system (driver context, SDK singleton).
///
/// [`release`](Self::release) is called exactly once, after every camera
/// opened from this system has been dropped.
pub trait CameraSystem {
    type Camera: Camera;

    /// Enumerate attached cameras.
    fn cameras(&mut self) -> Result<Vec<DeviceInfo>>;

    /// Open the camera at `index` without initializing it.
    fn open(&mut self, index: usize) -> Result<Self::Camera>;

    fn release(&mut self) -> Result<()>;
}

/// A single camera device.
///
/// Frames returned by [`next_frame`](Self::next_frame) stay owned by the
/// device queue until handed back through
/// [`release_frame`](Self::release_frame).
pub trait Camera {
    fn info(&self) -> &DeviceInfo;

    fn init(&mut self) -> Result<()>;

    fn deinit(&mut self) -> Result<()>;

    fn node_map(&mut self) -> &mut dyn NodeMap;

    fn begin_acquisition(&mut self) -> Result<()>;

    fn end_acquisition(&mut self) -> Result<()>;

    /// Block until the device delivers the next frame. There is no timeout.
    fn next_frame(&mut self) -> Result<RawFrame>;

    fn release_frame(&mut self, frame_id: u64) -> Result<()>;
}

/// A key press (or window close) reported by the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// On-screen preview.
pub trait PreviewDisplay {
    /// Replace the displayed image.
    fn show(&mut self, frame: &ConvertedFrame) -> Result<()>;

    /// Process window events for up to `timeout`, returning the first key
    /// pressed.
    fn wait_key(&mut self, timeout: Duration) -> Result<Option<KeyPress>>;
}

/// Destination for converted frames.
pub trait VideoSink {
    fn append(&mut self, frame: &ConvertedFrame) -> Result<()>;

    /// Finalize the container. Called exactly once.
    fn close(&mut self) -> Result<()>;
}
