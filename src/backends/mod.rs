// SPDX-License-Identifier: MPL-2.0

//! Frame sources
//!
//! - [`camera`]: backend trait, V4L2 devices and the [`camera::CameraStreamer`]
//! - [`virtual_camera`]: file and test-pattern sources

pub mod camera;
pub mod virtual_camera;
