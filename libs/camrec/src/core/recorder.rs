// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The recording workflow.
//!
//! ```text
//! Uninitialized -> DeviceOpen -> Acquiring -> AcquisitionEnded
//!               -> DeviceClosed -> ProcessReleased
//! ```
//!
//! Transitions only move forward. Any error aborts the run; the session
//! guards still tear down whatever was already set up, in the same order
//! as a clean finish: acquisition, device, writer, system.

use crate::core::session::{Acquisition, DeviceSession, SystemHandle, WriterGuard};
use crate::core::{
    AcquisitionConfig, Camera, CameraSystem, DisplayConfig, NegotiatedSettings, PreviewDisplay,
    RecorderConfig, RecorderError, Result, VideoSink, configure_device, convert_to_bgr8,
};

/// Lifecycle position of a [`Recorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Uninitialized,
    DeviceOpen,
    Acquiring,
    AcquisitionEnded,
    DeviceClosed,
    ProcessReleased,
}

/// Why the acquisition loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `max_frames` iterations completed.
    FrameLimit,
    /// The preview reported a key press.
    KeyPress(String),
}

/// Counters from one acquisition loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames pulled from the device, complete or not.
    pub iterations: u64,
    pub frames_written: u64,
    pub frames_incomplete: u64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub settings: NegotiatedSettings,
    pub stats: LoopStats,
    pub stop_reason: StopReason,
}

/// Pull frames until `max_frames` iterations or a key press.
///
/// Complete frames are converted, appended, shown, then released.
/// Incomplete frames are released without being shown or appended.
pub fn run_acquisition_loop<C, D, W>(
    acquisition: &mut Acquisition<'_, C>,
    display: &mut D,
    writer: &mut W,
    config: &AcquisitionConfig,
) -> Result<(LoopStats, StopReason)>
where
    C: Camera,
    D: PreviewDisplay,
    W: VideoSink,
{
    let mut stats = LoopStats::default();

    while stats.iterations < config.max_frames {
        let lease = acquisition.next_frame()?;
        stats.iterations += 1;

        if lease.frame().is_incomplete() {
            tracing::warn!("Skipped incomplete frame {}", lease.frame().frame_id);
            stats.frames_incomplete += 1;
            lease.release()?;
            continue;
        }

        let converted = convert_to_bgr8(lease.frame())?;
        writer.append(&converted)?;
        stats.frames_written += 1;

        display.show(&converted)?;
        let key = display.wait_key(config.key_wait())?;

        tracing::trace!("Frame {} recorded", converted.frame_id);
        lease.release()?;

        if let Some(key) = key {
            tracing::info!("Key '{}' pressed, stopping", key.key);
            return Ok((stats, StopReason::KeyPress(key.key)));
        }
    }

    Ok((stats, StopReason::FrameLimit))
}

/// Drives one recording run from device discovery to system release.
pub struct Recorder<'c> {
    config: &'c RecorderConfig,
    state: RecorderState,
}

impl<'c> Recorder<'c> {
    pub fn new(config: &'c RecorderConfig) -> Self {
        Self {
            config,
            state: RecorderState::Uninitialized,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    fn advance(&mut self, next: RecorderState) {
        tracing::debug!("Recorder state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Run the full workflow.
    ///
    /// `open_writer` receives the negotiated settings and is called once,
    /// before acquisition begins; a failure there aborts without touching
    /// the acquisition engine. `open_display` is called once acquisition is
    /// running.
    pub fn run<S, D, W, FW, FD>(
        &mut self,
        system: S,
        open_writer: FW,
        open_display: FD,
    ) -> Result<RecordingSummary>
    where
        S: CameraSystem,
        D: PreviewDisplay,
        W: VideoSink,
        FW: FnOnce(&NegotiatedSettings) -> Result<W>,
        FD: FnOnce(&DisplayConfig) -> Result<D>,
    {
        self.config.validate()?;

        let mut system = SystemHandle::new(system);

        let cameras = system.system_mut().cameras()?;
        if cameras.is_empty() {
            return Err(RecorderError::NoCameras);
        }
        for info in &cameras {
            tracing::info!("Found camera {}", info);
        }
        let index = self.config.device.index;
        if index >= cameras.len() {
            return Err(RecorderError::CameraIndex {
                index,
                count: cameras.len(),
            });
        }
        drop(cameras);

        // Declared ahead of the device so an early return closes the
        // writer after the device is de-initialized, as the success path does.
        let mut writer;

        let camera = system.system_mut().open(index)?;
        let mut device = DeviceSession::open(camera)?;
        self.advance(RecorderState::DeviceOpen);

        let settings = configure_device(device.camera_mut().node_map(), &self.config.device)?;

        writer = WriterGuard::new(open_writer(&settings)?);

        let mut acquisition = Acquisition::begin(device.camera_mut())?;
        self.advance(RecorderState::Acquiring);

        let mut display = open_display(&self.config.display)?;

        let (stats, stop_reason) = run_acquisition_loop(
            &mut acquisition,
            &mut display,
            writer.writer_mut(),
            &self.config.acquisition,
        )?;
        drop(display);

        acquisition.end()?;
        self.advance(RecorderState::AcquisitionEnded);

        device.close()?;
        self.advance(RecorderState::DeviceClosed);

        writer.close()?;

        system.release()?;
        self.advance(RecorderState::ProcessReleased);

        tracing::info!(
            "Recording finished: {} frames written, {} incomplete, stopped by {:?}",
            stats.frames_written,
            stats.frames_incomplete,
            stop_reason
        );

        Ok(RecordingSummary {
            settings,
            stats,
            stop_reason,
        })
    }
}
