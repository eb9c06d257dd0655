// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Video4Linux2 capture backend.

mod camera;
mod system;

pub use camera::V4lCamera;
pub use system::V4lSystem;
