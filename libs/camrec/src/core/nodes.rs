// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! GenICam-style feature nodes.
//!
//! Every camera backend exposes its tunables as named nodes with an access
//! mode. Device configuration only talks to [`NodeMap`], so the same
//! configuration path drives a V4L2 device, a vendor SDK, or an in-memory
//! simulation.

use std::collections::BTreeMap;

use crate::core::{RecorderError, Result};

/// Standard node names (SFNC).
pub mod names {
    pub const BINNING_HORIZONTAL: &str = "BinningHorizontal";
    pub const BINNING_VERTICAL: &str = "BinningVertical";
    pub const WIDTH: &str = "Width";
    pub const HEIGHT: &str = "Height";
    pub const ACQUISITION_MODE: &str = "AcquisitionMode";
    pub const ACQUISITION_FRAME_RATE: &str = "AcquisitionFrameRate";
    pub const DEVICE_MODEL_NAME: &str = "DeviceModelName";

    /// Entry of [`ACQUISITION_MODE`] selecting free-running capture.
    pub const CONTINUOUS: &str = "Continuous";
}

/// Access mode of a node or enumeration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    #[default]
    NotAvailable,
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::NotAvailable)
    }

    pub const fn is_readable(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub const fn is_writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Read/write access to a device's feature nodes.
pub trait NodeMap {
    /// Access mode of `node`; `NotAvailable` for unknown names.
    fn access(&self, node: &str) -> AccessMode;

    fn integer(&self, node: &str) -> Result<i64>;

    fn set_integer(&mut self, node: &str, value: i64) -> Result<()>;

    fn float(&self, node: &str) -> Result<f64>;

    /// Symbolic name of the current entry of an enumeration node.
    fn enumeration(&self, node: &str) -> Result<String>;

    /// Access mode of a single entry of an enumeration node.
    fn enum_entry_access(&self, node: &str, entry: &str) -> AccessMode;

    fn set_enumeration(&mut self, node: &str, entry: &str) -> Result<()>;

    fn string(&self, node: &str) -> Result<String> {
        Err(RecorderError::NodeUnavailable {
            node: node.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeValue {
    Integer { value: i64, min: i64, max: i64 },
    Float(f64),
    Enumeration {
        current: String,
        entries: Vec<(String, AccessMode)>,
    },
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    access: AccessMode,
    value: NodeValue,
}

/// Node map held entirely in memory.
///
/// Used by simulated devices and by backends that have no native node
/// tree and translate writes themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryNodeMap {
    nodes: BTreeMap<String, Node>,
}

impl MemoryNodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_integer(self, name: &str, value: i64, access: AccessMode) -> Self {
        self.with_integer_range(name, value, i64::MIN, i64::MAX, access)
    }

    pub fn with_integer_range(
        mut self,
        name: &str,
        value: i64,
        min: i64,
        max: i64,
        access: AccessMode,
    ) -> Self {
        self.nodes.insert(
            name.to_string(),
            Node {
                access,
                value: NodeValue::Integer { value, min, max },
            },
        );
        self
    }

    pub fn with_float(mut self, name: &str, value: f64, access: AccessMode) -> Self {
        self.nodes.insert(
            name.to_string(),
            Node {
                access,
                value: NodeValue::Float(value),
            },
        );
        self
    }

    pub fn with_enumeration(
        mut self,
        name: &str,
        current: &str,
        entries: &[(&str, AccessMode)],
        access: AccessMode,
    ) -> Self {
        self.nodes.insert(
            name.to_string(),
            Node {
                access,
                value: NodeValue::Enumeration {
                    current: current.to_string(),
                    entries: entries
                        .iter()
                        .map(|(entry, mode)| (entry.to_string(), *mode))
                        .collect(),
                },
            },
        );
        self
    }

    pub fn with_string(mut self, name: &str, value: &str, access: AccessMode) -> Self {
        self.nodes.insert(
            name.to_string(),
            Node {
                access,
                value: NodeValue::String(value.to_string()),
            },
        );
        self
    }

    /// Overwrite a float node regardless of its access mode.
    ///
    /// Backends use this to publish values the device reports (for example
    /// a frame rate negotiated by the driver) into a read-only node.
    pub fn store_float(&mut self, name: &str, value: f64) {
        if let Some(Node {
            value: NodeValue::Float(current),
            ..
        }) = self.nodes.get_mut(name)
        {
            *current = value;
        }
    }

    /// Overwrite an integer node regardless of its access mode.
    pub fn store_integer(&mut self, name: &str, value: i64) {
        if let Some(Node {
            value: NodeValue::Integer { value: current, .. },
            ..
        }) = self.nodes.get_mut(name)
        {
            *current = value;
        }
    }

    fn readable(&self, name: &str) -> Result<&Node> {
        let node = self.nodes.get(name).ok_or_else(|| RecorderError::NodeUnavailable {
            node: name.to_string(),
        })?;
        if !node.access.is_available() {
            return Err(RecorderError::NodeUnavailable {
                node: name.to_string(),
            });
        }
        if !node.access.is_readable() {
            return Err(RecorderError::node_access(name, "is not readable"));
        }
        Ok(node)
    }

    fn writable(&mut self, name: &str) -> Result<&mut Node> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| RecorderError::NodeUnavailable {
                node: name.to_string(),
            })?;
        if !node.access.is_available() {
            return Err(RecorderError::NodeUnavailable {
                node: name.to_string(),
            });
        }
        if !node.access.is_writable() {
            return Err(RecorderError::node_access(name, "is not writable"));
        }
        Ok(node)
    }
}

impl NodeMap for MemoryNodeMap {
    fn access(&self, node: &str) -> AccessMode {
        self.nodes
            .get(node)
            .map(|n| n.access)
            .unwrap_or(AccessMode::NotAvailable)
    }

    fn integer(&self, node: &str) -> Result<i64> {
        match &self.readable(node)?.value {
            NodeValue::Integer { value, .. } => Ok(*value),
            _ => Err(RecorderError::node_access(node, "is not an integer node")),
        }
    }

    fn set_integer(&mut self, node: &str, new_value: i64) -> Result<()> {
        match &mut self.writable(node)?.value {
            NodeValue::Integer { value, min, max } => {
                if new_value < *min || new_value > *max {
                    return Err(RecorderError::node_access(
                        node,
                        format!("rejects {} (range {}..={})", new_value, min, max),
                    ));
                }
                *value = new_value;
                Ok(())
            }
            _ => Err(RecorderError::node_access(node, "is not an integer node")),
        }
    }

    fn float(&self, node: &str) -> Result<f64> {
        match &self.readable(node)?.value {
            NodeValue::Float(value) => Ok(*value),
            NodeValue::Integer { value, .. } => Ok(*value as f64),
            _ => Err(RecorderError::node_access(node, "is not a float node")),
        }
    }

    fn enumeration(&self, node: &str) -> Result<String> {
        match &self.readable(node)?.value {
            NodeValue::Enumeration { current, .. } => Ok(current.clone()),
            _ => Err(RecorderError::node_access(node, "is not an enumeration node")),
        }
    }

    fn enum_entry_access(&self, node: &str, entry: &str) -> AccessMode {
        match self.nodes.get(node) {
            Some(Node {
                value: NodeValue::Enumeration { entries, .. },
                ..
            }) => entries
                .iter()
                .find(|(name, _)| name == entry)
                .map(|(_, mode)| *mode)
                .unwrap_or(AccessMode::NotAvailable),
            _ => AccessMode::NotAvailable,
        }
    }

    fn set_enumeration(&mut self, node: &str, entry: &str) -> Result<()> {
        match &mut self.writable(node)?.value {
            NodeValue::Enumeration { current, entries } => {
                let known = entries
                    .iter()
                    .any(|(name, mode)| name == entry && mode.is_available());
                if !known {
                    return Err(RecorderError::node_access(
                        node,
                        format!("has no available entry '{}'", entry),
                    ));
                }
                *current = entry.to_string();
                Ok(())
            }
            _ => Err(RecorderError::node_access(node, "is not an enumeration node")),
        }
    }

    fn string(&self, node: &str) -> Result<String> {
        match &self.readable(node)?.value {
            NodeValue::String(value) => Ok(value.clone()),
            _ => Err(RecorderError::node_access(node, "is not a string node")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_predicates() {
        assert!(!AccessMode::NotAvailable.is_available());
        assert!(AccessMode::ReadOnly.is_readable());
        assert!(!AccessMode::ReadOnly.is_writable());
        assert!(AccessMode::WriteOnly.is_writable());
        assert!(!AccessMode::WriteOnly.is_readable());
        assert!(AccessMode::ReadWrite.is_readable() && AccessMode::ReadWrite.is_writable());
    }

    #[test]
    fn test_integer_range_is_enforced() {
        let mut nodes =
            MemoryNodeMap::new().with_integer_range(names::WIDTH, 1440, 8, 1440, AccessMode::ReadWrite);

        nodes.set_integer(names::WIDTH, 720).unwrap();
        assert_eq!(nodes.integer(names::WIDTH).unwrap(), 720);

        let err = nodes.set_integer(names::WIDTH, 2000).unwrap_err();
        assert!(matches!(err, RecorderError::NodeAccess { .. }));
        assert_eq!(nodes.integer(names::WIDTH).unwrap(), 720);
    }

    #[test]
    fn test_read_only_node_rejects_writes() {
        let mut nodes =
            MemoryNodeMap::new().with_float(names::ACQUISITION_FRAME_RATE, 30.0, AccessMode::ReadOnly);

        assert_eq!(nodes.float(names::ACQUISITION_FRAME_RATE).unwrap(), 30.0);
        assert!(nodes.set_integer(names::ACQUISITION_FRAME_RATE, 1).is_err());

        nodes.store_float(names::ACQUISITION_FRAME_RATE, 59.94);
        assert_eq!(nodes.float(names::ACQUISITION_FRAME_RATE).unwrap(), 59.94);
    }

    #[test]
    fn test_unknown_node_is_unavailable() {
        let nodes = MemoryNodeMap::new();
        assert_eq!(nodes.access("Gain"), AccessMode::NotAvailable);
        assert!(matches!(
            nodes.integer("Gain"),
            Err(RecorderError::NodeUnavailable { .. })
        ));
    }

    #[test]
    fn test_enumeration_entries() {
        let mut nodes = MemoryNodeMap::new().with_enumeration(
            names::ACQUISITION_MODE,
            "SingleFrame",
            &[
                ("SingleFrame", AccessMode::ReadOnly),
                (names::CONTINUOUS, AccessMode::ReadOnly),
                ("MultiFrame", AccessMode::NotAvailable),
            ],
            AccessMode::ReadWrite,
        );

        assert_eq!(
            nodes.enum_entry_access(names::ACQUISITION_MODE, names::CONTINUOUS),
            AccessMode::ReadOnly
        );
        assert_eq!(
            nodes.enum_entry_access(names::ACQUISITION_MODE, "Bogus"),
            AccessMode::NotAvailable
        );

        nodes
            .set_enumeration(names::ACQUISITION_MODE, names::CONTINUOUS)
            .unwrap();
        assert_eq!(
            nodes.enumeration(names::ACQUISITION_MODE).unwrap(),
            names::CONTINUOUS
        );
        assert!(nodes
            .set_enumeration(names::ACQUISITION_MODE, "MultiFrame")
            .is_err());
    }
}
