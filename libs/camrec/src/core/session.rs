// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Scoped ownership of the camera system, device, acquisition, frames and
//! writer.
//!
//! Each guard has an explicit consuming teardown that reports errors, and a
//! `Drop` fallback that performs the same teardown (logging failures) when an
//! early return skips the explicit call. Teardown therefore happens exactly
//! once on every exit path.

use crate::core::{Camera, CameraSystem, RawFrame, Result, VideoSink};

/// Owns the process-wide camera system until released.
pub struct SystemHandle<S: CameraSystem> {
    system: S,
    released: bool,
}

impl<S: CameraSystem> SystemHandle<S> {
    pub fn new(system: S) -> Self {
        Self {
            system,
            released: false,
        }
    }

    pub fn system_mut(&mut self) -> &mut S {
        &mut self.system
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.system.release()
    }
}

impl<S: CameraSystem> Drop for SystemHandle<S> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.system.release() {
                tracing::warn!("Failed to release camera system: {}", e);
            }
        }
    }
}

/// An initialized camera; de-initialized on close or drop.
pub struct DeviceSession<C: Camera> {
    camera: C,
    initialized: bool,
}

impl<C: Camera> DeviceSession<C> {
    pub fn open(mut camera: C) -> Result<Self> {
        camera.init()?;
        tracing::info!("Camera initialized: {}", camera.info());
        Ok(Self {
            camera,
            initialized: true,
        })
    }

    pub fn camera_mut(&mut self) -> &mut C {
        &mut self.camera
    }

    pub fn close(mut self) -> Result<()> {
        self.initialized = false;
        self.camera.deinit()
    }
}

impl<C: Camera> Drop for DeviceSession<C> {
    fn drop(&mut self) {
        if self.initialized {
            self.initialized = false;
            if let Err(e) = self.camera.deinit() {
                tracing::warn!("Failed to de-initialize camera: {}", e);
            }
        }
    }
}

/// Running acquisition on a borrowed camera.
pub struct Acquisition<'a, C: Camera> {
    camera: &'a mut C,
    active: bool,
}

impl<'a, C: Camera> Acquisition<'a, C> {
    pub fn begin(camera: &'a mut C) -> Result<Self> {
        camera.begin_acquisition()?;
        tracing::info!("Acquisition started");
        Ok(Self {
            camera,
            active: true,
        })
    }

    /// Block for the next frame. The returned lease must be released (or
    /// dropped) before the next call.
    pub fn next_frame(&mut self) -> Result<FrameLease<'_, C>> {
        let frame = self.camera.next_frame()?;
        Ok(FrameLease {
            camera: &mut *self.camera,
            frame,
            released: false,
        })
    }

    pub fn end(mut self) -> Result<()> {
        self.active = false;
        self.camera.end_acquisition()?;
        tracing::info!("Acquisition ended");
        Ok(())
    }
}

impl<C: Camera> Drop for Acquisition<'_, C> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(e) = self.camera.end_acquisition() {
                tracing::warn!("Failed to end acquisition: {}", e);
            }
        }
    }
}

/// A frame borrowed from the device queue.
pub struct FrameLease<'a, C: Camera> {
    camera: &'a mut C,
    frame: RawFrame,
    released: bool,
}

impl<C: Camera> FrameLease<'_, C> {
    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    /// Hand the buffer back to the device queue.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.camera.release_frame(self.frame.frame_id)
    }
}

impl<C: Camera> Drop for FrameLease<'_, C> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.camera.release_frame(self.frame.frame_id) {
                tracing::warn!("Failed to release frame {}: {}", self.frame.frame_id, e);
            }
        }
    }
}

/// Open video writer; closed exactly once.
pub struct WriterGuard<W: VideoSink> {
    writer: W,
    closed: bool,
}

impl<W: VideoSink> WriterGuard<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.writer.close()
    }
}

impl<W: VideoSink> Drop for WriterGuard<W> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.writer.close() {
                tracing::warn!("Failed to close video writer: {}", e);
            }
        }
    }
}
