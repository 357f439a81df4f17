// SPDX-License-Identifier: GPL-3.0-only

//! Scoped camera acquisition
//!
//! A [`CameraStreamer`] holds exactly one capture session from the moment
//! `start` succeeds until it is stopped or dropped. Frames are consumed
//! latest-wins: the renderer only ever sees the newest frame.

use super::types::*;
use super::{CameraBackend, CaptureSession};
use crate::constants::capture;
use crate::errors::CameraError;
use futures::channel::mpsc;
use tracing::{info, warn};

/// What to open
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest {
    /// Specific device; `None` lets the backend choose
    pub device: Option<CameraDevice>,
    /// Requested geometry; the backend may adjust it
    pub format: CameraFormat,
}

/// Live camera feed with deterministic release
pub struct CameraStreamer {
    session: Option<Box<dyn CaptureSession>>,
    receiver: FrameReceiver,
    latest: Option<CameraFrame>,
    received: u64,
}

impl CameraStreamer {
    /// Acquire a device and start streaming
    ///
    /// Fails with [`CameraError::PermissionDenied`] or
    /// [`CameraError::DeviceUnavailable`] when the device cannot be had.
    /// There is no retry.
    pub fn start(
        backend: &dyn CameraBackend,
        request: &CaptureRequest,
    ) -> Result<Self, CameraError> {
        let (sender, receiver) = mpsc::channel(capture::FRAME_CHANNEL_CAPACITY);

        let session = backend
            .open(request.device.as_ref(), &request.format, sender)
            .map_err(|e| {
                let err = CameraError::from(e);
                warn!(backend = %backend.backend_type(), error = %err, "Camera acquisition failed");
                err
            })?;

        info!(
            backend = %backend.backend_type(),
            device = %session.device().name,
            format = %session.format(),
            "Camera stream started"
        );

        Ok(Self {
            session: Some(session),
            receiver,
            latest: None,
            received: 0,
        })
    }

    /// Newest frame available, without blocking
    ///
    /// Drains everything queued since the last call and keeps the last one.
    /// Returns the previous frame again when nothing new arrived, and `None`
    /// until the first frame shows up.
    pub fn latest_frame(&mut self) -> Option<&CameraFrame> {
        while let Ok(frame) = self.receiver.try_recv() {
            self.received += 1;
            self.latest = Some(frame);
        }
        self.latest.as_ref()
    }

    /// Whether a device is currently held
    pub fn is_active(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_active())
    }

    /// Why the held device stopped streaming, e.g. it was unplugged
    pub fn fault(&self) -> Option<CameraError> {
        self.session.as_ref().and_then(|s| s.fault())
    }

    /// The held device, if any
    pub fn device(&self) -> Option<&CameraDevice> {
        self.session.as_ref().map(|s| s.device())
    }

    /// Negotiated frame geometry, if streaming
    pub fn format(&self) -> Option<CameraFormat> {
        self.session.as_ref().map(|s| s.format())
    }

    /// Frames pulled off the channel so far
    pub fn frames_received(&self) -> u64 {
        self.received
    }

    /// Release the device. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!(device = %session.device().name, "Stopping camera stream");
            session.release();
        }
        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        self.latest = None;
    }
}

impl Drop for CameraStreamer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CameraStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraStreamer")
            .field("device", &self.device())
            .field("active", &self.is_active())
            .field("received", &self.received)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::VirtualCameraBackend;
    use std::time::{Duration, Instant};

    struct DenyingBackend;

    impl CameraBackend for DenyingBackend {
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::V4l2
        }

        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            Vec::new()
        }

        fn open(
            &self,
            _device: Option<&CameraDevice>,
            _format: &CameraFormat,
            _sender: FrameSender,
        ) -> BackendResult<Box<dyn CaptureSession>> {
            Err(CameraError::PermissionDenied("/dev/video0".to_string()).into())
        }
    }

    /// Opens fine, then behaves like a device that was unplugged
    struct UnpluggedBackend;

    struct UnpluggedSession(CameraDevice);

    impl CaptureSession for UnpluggedSession {
        fn device(&self) -> &CameraDevice {
            &self.0
        }

        fn format(&self) -> CameraFormat {
            CameraFormat::default()
        }

        fn is_active(&self) -> bool {
            false
        }

        fn fault(&self) -> Option<CameraError> {
            Some(CameraError::Disconnected)
        }

        fn release(&mut self) {}
    }

    impl CameraBackend for UnpluggedBackend {
        fn backend_type(&self) -> CameraBackendType {
            CameraBackendType::V4l2
        }

        fn enumerate_cameras(&self) -> Vec<CameraDevice> {
            Vec::new()
        }

        fn open(
            &self,
            _device: Option<&CameraDevice>,
            _format: &CameraFormat,
            _sender: FrameSender,
        ) -> BackendResult<Box<dyn CaptureSession>> {
            Ok(Box::new(UnpluggedSession(CameraDevice {
                name: "Unplugged".to_string(),
                path: "/dev/video0".to_string(),
                driver: None,
            })))
        }
    }

    fn small_request() -> CaptureRequest {
        CaptureRequest {
            device: None,
            format: CameraFormat {
                width: 16,
                height: 12,
            },
        }
    }

    #[test]
    fn test_denied_start_reports_permission_denied() {
        let err = CameraStreamer::start(&DenyingBackend, &small_request()).unwrap_err();
        assert!(matches!(err, CameraError::PermissionDenied(_)));
    }

    #[test]
    fn test_unplugged_device_reports_disconnect() {
        let mut streamer = CameraStreamer::start(&UnpluggedBackend, &small_request()).unwrap();
        assert!(!streamer.is_active());
        assert_eq!(streamer.fault(), Some(CameraError::Disconnected));

        streamer.stop();
        assert_eq!(streamer.fault(), None);
    }

    #[test]
    fn test_healthy_stream_has_no_fault() {
        let backend = VirtualCameraBackend::test_pattern();
        let streamer = CameraStreamer::start(&backend, &small_request()).unwrap();
        assert_eq!(streamer.fault(), None);
    }

    #[test]
    fn test_latest_frame_keeps_newest() {
        let backend = VirtualCameraBackend::test_pattern();
        let mut streamer = CameraStreamer::start(&backend, &small_request()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while streamer.frames_received() < 2 {
            streamer.latest_frame();
            assert!(Instant::now() < deadline, "test pattern produced no frames");
            std::thread::sleep(Duration::from_millis(5));
        }

        let first = streamer.latest_frame().map(|f| f.sequence).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        let later = streamer.latest_frame().map(|f| f.sequence).unwrap();
        assert!(later > first);
    }

    #[test]
    fn test_drop_releases_device() {
        let backend = VirtualCameraBackend::test_pattern();
        {
            let streamer = CameraStreamer::start(&backend, &small_request()).unwrap();
            assert!(streamer.is_active());
            assert_eq!(backend.open_sessions(), 1);
        }
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let backend = VirtualCameraBackend::test_pattern();
        let mut streamer = CameraStreamer::start(&backend, &small_request()).unwrap();
        streamer.stop();
        streamer.stop();
        assert!(!streamer.is_active());
        assert!(streamer.latest_frame().is_none());
        assert_eq!(backend.open_sessions(), 0);
    }
}
