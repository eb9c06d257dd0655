// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Push the recording configuration into a camera's node map.

use crate::core::nodes::names;
use crate::core::{DeviceConfig, NodeMap, RecorderError, Result};

/// Settings read back from the device after configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegotiatedSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

/// Configure binning, resolution and continuous acquisition, then read the
/// negotiated frame rate.
///
/// Binning nodes the hardware does not expose are skipped with a warning;
/// everything else that cannot be written aborts.
pub fn configure_device(nodes: &mut dyn NodeMap, config: &DeviceConfig) -> Result<NegotiatedSettings> {
    for node in [names::BINNING_HORIZONTAL, names::BINNING_VERTICAL] {
        if nodes.access(node).is_available() {
            nodes.set_integer(node, config.binning as i64)?;
            tracing::debug!("{} = {}", node, config.binning);
        } else if config.binning > 1 {
            tracing::warn!(
                "{} not available on this device, relying on Width/Height only",
                node
            );
        }
    }

    nodes.set_integer(names::WIDTH, config.binned_width() as i64)?;
    nodes.set_integer(names::HEIGHT, config.binned_height() as i64)?;

    set_continuous_acquisition(nodes)?;
    tracing::info!("Acquisition mode set to continuous");

    let access = nodes.access(names::ACQUISITION_FRAME_RATE);
    if !access.is_available() || !access.is_readable() {
        return Err(RecorderError::node_access(
            names::ACQUISITION_FRAME_RATE,
            "cannot be read, unable to retrieve frame rate",
        ));
    }
    let frame_rate = nodes.float(names::ACQUISITION_FRAME_RATE)?;
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return Err(RecorderError::Device(format!(
            "device reported an invalid frame rate: {}",
            frame_rate
        )));
    }

    let settings = NegotiatedSettings {
        width: read_dimension(nodes, names::WIDTH, config.binned_width())?,
        height: read_dimension(nodes, names::HEIGHT, config.binned_height())?,
        frame_rate,
    };
    tracing::info!(
        "Device configured: {}x{} @ {:.2} fps (binning {})",
        settings.width,
        settings.height,
        settings.frame_rate,
        config.binning
    );
    Ok(settings)
}

fn set_continuous_acquisition(nodes: &mut dyn NodeMap) -> Result<()> {
    let mode = nodes.access(names::ACQUISITION_MODE);
    if !mode.is_available() || !mode.is_writable() {
        return Err(RecorderError::node_access(
            names::ACQUISITION_MODE,
            "cannot be written, unable to set acquisition mode to continuous",
        ));
    }

    let entry = nodes.enum_entry_access(names::ACQUISITION_MODE, names::CONTINUOUS);
    if !entry.is_available() || !entry.is_readable() {
        return Err(RecorderError::node_access(
            names::ACQUISITION_MODE,
            "has no readable 'Continuous' entry, unable to set acquisition mode to continuous",
        ));
    }

    nodes.set_enumeration(names::ACQUISITION_MODE, names::CONTINUOUS)
}

fn read_dimension(nodes: &dyn NodeMap, node: &str, written: u32) -> Result<u32> {
    if !nodes.access(node).is_readable() {
        // Write-only geometry: trust what was written.
        return Ok(written);
    }
    let value = nodes.integer(node)?;
    u32::try_from(value)
        .map_err(|_| RecorderError::Device(format!("{} out of range: {}", node, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nodes::{AccessMode, MemoryNodeMap};

    fn flir_like() -> MemoryNodeMap {
        MemoryNodeMap::new()
            .with_integer_range(names::BINNING_HORIZONTAL, 1, 1, 4, AccessMode::ReadWrite)
            .with_integer_range(names::BINNING_VERTICAL, 1, 1, 4, AccessMode::ReadWrite)
            .with_integer_range(names::WIDTH, 1440, 8, 1440, AccessMode::ReadWrite)
            .with_integer_range(names::HEIGHT, 1080, 8, 1080, AccessMode::ReadWrite)
            .with_enumeration(
                names::ACQUISITION_MODE,
                "SingleFrame",
                &[
                    ("SingleFrame", AccessMode::ReadOnly),
                    (names::CONTINUOUS, AccessMode::ReadOnly),
                ],
                AccessMode::ReadWrite,
            )
            .with_float(names::ACQUISITION_FRAME_RATE, 42.5, AccessMode::ReadOnly)
    }

    #[test]
    fn test_configure_sets_binning_geometry_and_mode() {
        let mut nodes = flir_like();
        let settings = configure_device(&mut nodes, &DeviceConfig::default()).unwrap();

        assert_eq!(nodes.integer(names::BINNING_HORIZONTAL).unwrap(), 2);
        assert_eq!(nodes.integer(names::BINNING_VERTICAL).unwrap(), 2);
        assert_eq!(nodes.integer(names::WIDTH).unwrap(), 720);
        assert_eq!(nodes.integer(names::HEIGHT).unwrap(), 540);
        assert_eq!(
            nodes.enumeration(names::ACQUISITION_MODE).unwrap(),
            names::CONTINUOUS
        );
        assert_eq!(
            settings,
            NegotiatedSettings {
                width: 720,
                height: 540,
                frame_rate: 42.5
            }
        );
    }

    #[test]
    fn test_missing_binning_is_tolerated() {
        let mut nodes = MemoryNodeMap::new()
            .with_integer(names::WIDTH, 640, AccessMode::ReadWrite)
            .with_integer(names::HEIGHT, 480, AccessMode::ReadWrite)
            .with_enumeration(
                names::ACQUISITION_MODE,
                names::CONTINUOUS,
                &[(names::CONTINUOUS, AccessMode::ReadOnly)],
                AccessMode::ReadWrite,
            )
            .with_float(names::ACQUISITION_FRAME_RATE, 30.0, AccessMode::ReadOnly);

        let settings = configure_device(&mut nodes, &DeviceConfig::default()).unwrap();
        assert_eq!((settings.width, settings.height), (720, 540));
    }

    #[test]
    fn test_binning_write_rejected_aborts() {
        let mut nodes = flir_like()
            .with_integer_range(names::BINNING_HORIZONTAL, 1, 1, 1, AccessMode::ReadWrite);
        let err = configure_device(&mut nodes, &DeviceConfig::default()).unwrap_err();
        assert!(matches!(err, RecorderError::NodeAccess { .. }));
    }

    #[test]
    fn test_read_only_acquisition_mode_aborts() {
        let mut nodes = flir_like().with_enumeration(
            names::ACQUISITION_MODE,
            "SingleFrame",
            &[(names::CONTINUOUS, AccessMode::ReadOnly)],
            AccessMode::ReadOnly,
        );
        let err = configure_device(&mut nodes, &DeviceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unable to set acquisition mode"));
    }

    #[test]
    fn test_missing_continuous_entry_aborts() {
        let mut nodes = flir_like().with_enumeration(
            names::ACQUISITION_MODE,
            "SingleFrame",
            &[
                ("SingleFrame", AccessMode::ReadOnly),
                (names::CONTINUOUS, AccessMode::NotAvailable),
            ],
            AccessMode::ReadWrite,
        );
        let err = configure_device(&mut nodes, &DeviceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("'Continuous'"));
    }

    #[test]
    fn test_unreadable_frame_rate_aborts() {
        let mut nodes =
            flir_like().with_float(names::ACQUISITION_FRAME_RATE, 30.0, AccessMode::WriteOnly);
        let err = configure_device(&mut nodes, &DeviceConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unable to retrieve frame rate"));
    }

    #[test]
    fn test_zero_frame_rate_aborts() {
        let mut nodes =
            flir_like().with_float(names::ACQUISITION_FRAME_RATE, 0.0, AccessMode::ReadOnly);
        assert!(matches!(
            configure_device(&mut nodes, &DeviceConfig::default()),
            Err(RecorderError::Device(_))
        ));
    }
}
