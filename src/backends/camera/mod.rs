// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌─────────────────────┐
//! │   CameraStreamer    │  ← scoped acquisition, latest-frame access
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  CameraBackend      │  ← enumerate + open
//! └──────────┬──────────┘
//!            │ CaptureSession (one per open device)
//!            ▼
//!   ┌──────┐ ┌──────┐ ┌─────────────┐
//!   │ V4L2 │ │ File │ │ TestPattern │
//!   └──────┘ └──────┘ └─────────────┘
//! ```
//!
//! Sessions push RGBA [`CameraFrame`]s into a bounded channel from their own
//! capture thread. Dropping a session releases its device.

pub mod format_converters;
pub mod frame_loop;
pub mod streamer;
pub mod types;
pub mod v4l2;

pub use streamer::{CameraStreamer, CaptureRequest};
pub use types::*;

use crate::backends::virtual_camera::VirtualCameraBackend;
use crate::config::Config;
use crate::errors::CameraError;

/// A source of capture devices
pub trait CameraBackend: Send {
    /// Which kind of backend this is
    fn backend_type(&self) -> CameraBackendType;

    /// Enumerate available cameras on this backend
    fn enumerate_cameras(&self) -> Vec<CameraDevice>;

    /// Acquire a device and start streaming frames into `sender`
    ///
    /// With `device == None` the backend picks its first device. Access
    /// problems come back as [`BackendError::Camera`] carrying
    /// `PermissionDenied` or `DeviceUnavailable`.
    fn open(
        &self,
        device: Option<&CameraDevice>,
        format: &CameraFormat,
        sender: FrameSender,
    ) -> BackendResult<Box<dyn CaptureSession>>;
}

/// An acquired capture device
///
/// Implementations release the device in `Drop` as well as in
/// [`CaptureSession::release`]; releasing twice is a no-op.
pub trait CaptureSession: Send {
    /// The device this session holds
    fn device(&self) -> &CameraDevice;

    /// Negotiated frame geometry
    fn format(&self) -> CameraFormat;

    /// Whether frames are still being produced
    fn is_active(&self) -> bool;

    /// Why the session stopped producing frames on its own, if it did
    fn fault(&self) -> Option<CameraError> {
        None
    }

    /// Stop streaming and release the device
    fn release(&mut self);
}

/// Build the backend selected in the configuration
pub fn backend_from_config(config: &Config) -> Box<dyn CameraBackend> {
    match config.backend {
        CameraBackendType::V4l2 => Box::new(v4l2::V4l2Backend::new()),
        CameraBackendType::File => Box::new(VirtualCameraBackend::file(
            config.file_source.clone().unwrap_or_default(),
        )),
        CameraBackendType::TestPattern => Box::new(VirtualCameraBackend::test_pattern()),
    }
}

/// Find a device by path among the backend's devices
pub fn find_device(backend: &dyn CameraBackend, path: &str) -> Option<CameraDevice> {
    backend
        .enumerate_cameras()
        .into_iter()
        .find(|device| device.path == path)
}
