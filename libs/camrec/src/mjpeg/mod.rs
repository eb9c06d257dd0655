// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Motion-JPEG recording into AVI containers.

pub mod avi;
mod writer;

pub use avi::AviWriter;
pub use writer::{MjpegWriter, MjpegWriterConfig, segment_path};
