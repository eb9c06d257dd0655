// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(clippy::too_many_arguments)] // scale/convert helpers take full geometry
#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;
pub mod display;
pub mod mjpeg;

#[cfg(target_os = "linux")]
pub mod linux;

pub use core::{
    AccessMode, Acquisition, AcquisitionConfig, Camera, CameraSystem, ConvertedFrame,
    DeviceConfig, DeviceInfo, DeviceSession, DisplayConfig, FrameLease, KeyPress, LoopStats,
    MemoryNodeMap, NegotiatedSettings, NodeMap, PixelFormat, PreviewDisplay, RawFrame, Recorder,
    RecorderConfig, RecorderError, RecorderState, RecordingSummary, Result, StopReason,
    SystemHandle, VideoConfig, VideoSink, WriterGuard, configure_device, convert_to_bgr8,
    run_acquisition_loop,
};
pub use display::HeadlessDisplay;
#[cfg(feature = "preview")]
pub use display::PreviewWindow;
pub use mjpeg::{MjpegWriter, MjpegWriterConfig};

#[cfg(target_os = "linux")]
pub use linux::{V4lCamera, V4lSystem};
