// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("No cameras found")]
    NoCameras,

    #[error("Camera index {index} out of range ({count} attached)")]
    CameraIndex { index: usize, count: usize },

    #[error("Node '{node}' is not available")]
    NodeUnavailable { node: String },

    #[error("Node '{node}' {reason}")]
    NodeAccess { node: String, reason: String },

    #[error("Device error: {0}")]
    Device(String),

    #[error("Previous frame {0} was not released before requesting the next one")]
    FrameNotReleased(u64),

    #[error("Pixel conversion failed: {0}")]
    Conversion(String),

    #[error("Video encoding failed: {0}")]
    Encoding(String),

    #[error("Display error: {0}")]
    Display(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecorderError {
    pub(crate) fn node_access(node: &str, reason: impl Into<String>) -> Self {
        Self::NodeAccess {
            node: node.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
