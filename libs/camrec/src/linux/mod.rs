// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod v4l2;

pub use v4l2::{V4lCamera, V4lSystem};
