// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod config;
pub mod convert;
pub mod device_config;
pub mod error;
pub mod frame;
pub mod nodes;
pub mod pixel_format;
pub mod recorder;
pub mod session;
pub mod traits;

pub use config::{AcquisitionConfig, DeviceConfig, DisplayConfig, RecorderConfig, VideoConfig};
pub use convert::convert_to_bgr8;
pub use device_config::{NegotiatedSettings, configure_device};
pub use error::{RecorderError, Result};
pub use frame::{ConvertedFrame, RawFrame};
pub use nodes::{AccessMode, MemoryNodeMap, NodeMap};
pub use pixel_format::PixelFormat;
pub use recorder::{
    LoopStats, Recorder, RecorderState, RecordingSummary, StopReason, run_acquisition_loop,
};
pub use session::{Acquisition, DeviceSession, FrameLease, SystemHandle, WriterGuard};
pub use traits::{Camera, CameraSystem, DeviceInfo, KeyPress, PreviewDisplay, VideoSink};
