// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;

use v4l::Device;
use v4l::capability::Flags as CapabilityFlags;

use super::camera::V4lCamera;
use crate::core::{CameraSystem, DeviceInfo, RecorderError, Result};

/// Capture-capable `/dev/video*` nodes.
#[derive(Default)]
pub struct V4lSystem {
    devices: Vec<(DeviceInfo, PathBuf)>,
}

impl V4lSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraSystem for V4lSystem {
    type Camera = V4lCamera;

    fn cameras(&mut self) -> Result<Vec<DeviceInfo>> {
        let mut nodes = v4l::context::enum_devices();
        nodes.sort_by_key(|node| node.index());

        self.devices.clear();
        for node in nodes {
            let path = node.path().to_path_buf();
            // Metadata and output nodes share the /dev/video* namespace.
            let caps = match Device::with_path(&path).and_then(|dev| dev.query_caps()) {
                Ok(caps) => caps,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if !caps.capabilities.contains(CapabilityFlags::VIDEO_CAPTURE) {
                tracing::debug!("Skipping {}: not a capture device", path.display());
                continue;
            }

            let info = DeviceInfo {
                index: self.devices.len(),
                model: caps.card.clone(),
                location: format!("{} ({})", path.display(), caps.bus),
            };
            self.devices.push((info, path));
        }

        Ok(self.devices.iter().map(|(info, _)| info.clone()).collect())
    }

    fn open(&mut self, index: usize) -> Result<V4lCamera> {
        let (info, path) = self
            .devices
            .get(index)
            .cloned()
            .ok_or(RecorderError::CameraIndex {
                index,
                count: self.devices.len(),
            })?;
        V4lCamera::open(info, path)
    }

    fn release(&mut self) -> Result<()> {
        tracing::debug!("Released V4L2 device list ({} entries)", self.devices.len());
        self.devices.clear();
        Ok(())
    }
}
