// SPDX-License-Identifier: GPL-3.0-only

//! Virtual cameras
//!
//! A still image file or a synthetic test pattern, streamed at a fixed rate
//! through the same [`CameraBackend`] interface as real devices. Each open
//! session counts as one active track until it is released, which makes
//! teardown observable without hardware.

pub mod file_source;

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction};
use crate::backends::camera::types::*;
use crate::backends::camera::{CameraBackend, CaptureSession};
use crate::constants::capture;
use crate::errors::CameraError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

pub use file_source::{load_image_as_frame, test_pattern_frame};

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    TestPattern,
}

/// Backend serving a file or the test pattern
#[derive(Debug, Clone)]
pub struct VirtualCameraBackend {
    source: Source,
    open_sessions: Arc<AtomicUsize>,
}

impl VirtualCameraBackend {
    /// Stream a still image file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stream animated colour bars
    pub fn test_pattern() -> Self {
        Self {
            source: Source::TestPattern,
            open_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently holding the source
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }
}

impl CameraBackend for VirtualCameraBackend {
    fn backend_type(&self) -> CameraBackendType {
        match self.source {
            Source::File(_) => CameraBackendType::File,
            Source::TestPattern => CameraBackendType::TestPattern,
        }
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        match &self.source {
            Source::File(path) if path.is_file() => vec![file_source::file_device(path)],
            Source::File(_) => Vec::new(),
            Source::TestPattern => vec![file_source::test_pattern_device()],
        }
    }

    fn open(
        &self,
        _device: Option<&CameraDevice>,
        format: &CameraFormat,
        mut sender: FrameSender,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        let (device, format, mut next_frame): (_, _, Box<dyn FnMut(u64) -> CameraFrame + Send>) =
            match &self.source {
                Source::File(path) if path.as_os_str().is_empty() => {
                    return Err(CameraError::DeviceUnavailable(
                        "No file source configured".to_string(),
                    )
                    .into());
                }
                Source::File(path) => {
                    let still = load_image_as_frame(path)?;
                    let format = CameraFormat {
                        width: still.width,
                        height: still.height,
                    };
                    let next = move |sequence| CameraFrame {
                        sequence,
                        captured_at: std::time::Instant::now(),
                        ..still.clone()
                    };
                    (file_source::file_device(path), format, Box::new(next))
                }
                Source::TestPattern => {
                    let format = *format;
                    let next = move |sequence| test_pattern_frame(&format, sequence);
                    (file_source::test_pattern_device(), format, Box::new(next))
                }
            };

        info!(device = %device.name, resolution = %format, "Opening virtual camera");

        let track = TrackGuard::acquire(&self.open_sessions);
        let mut sequence = 0u64;
        let controller = CaptureLoopController::start(
            &format!("virtual-capture-{}", self.backend_type()),
            move || {
                let frame = next_frame(sequence);
                sequence += 1;
                if let Err(e) = sender.try_send(frame)
                    && e.is_disconnected()
                {
                    return LoopAction::Stop;
                }
                std::thread::sleep(capture::VIRTUAL_FRAME_DURATION);
                LoopAction::Continue
            },
        );

        Ok(Box::new(VirtualSession {
            device,
            format,
            controller: Some(controller),
            track: Some(track),
        }))
    }
}

/// Counts one active track for as long as it lives
struct TrackGuard(Arc<AtomicUsize>);

impl TrackGuard {
    fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for TrackGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// An open virtual camera
pub struct VirtualSession {
    device: CameraDevice,
    format: CameraFormat,
    controller: Option<CaptureLoopController>,
    track: Option<TrackGuard>,
}

impl CaptureSession for VirtualSession {
    fn device(&self) -> &CameraDevice {
        &self.device
    }

    fn format(&self) -> CameraFormat {
        self.format
    }

    fn is_active(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    fn release(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            info!(device = %self.device.name, "Releasing virtual camera");
            controller.stop();
        }
        self.track.take();
    }
}

impl Drop for VirtualSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use std::time::{Duration, Instant};

    #[test]
    fn test_pattern_session_streams_and_releases() {
        let backend = VirtualCameraBackend::test_pattern();
        let (sender, mut receiver) = mpsc::channel(capture::FRAME_CHANNEL_CAPACITY);
        let format = CameraFormat {
            width: 32,
            height: 24,
        };

        let mut session = backend.open(None, &format, sender).unwrap();
        assert_eq!(backend.open_sessions(), 1);
        assert_eq!(session.format(), format);

        let deadline = Instant::now() + Duration::from_secs(2);
        let frame = loop {
            if let Ok(frame) = receiver.try_recv() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no frame from test pattern");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!((frame.width, frame.height), (32, 24));

        session.release();
        assert!(!session.is_active());
        assert_eq!(backend.open_sessions(), 0);

        // Second release is a no-op
        session.release();
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn test_missing_file_source_is_unavailable() {
        let backend = VirtualCameraBackend::file("");
        let (sender, _receiver) = mpsc::channel(1);
        let err = backend
            .open(None, &CameraFormat::default(), sender)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BackendError::Camera(CameraError::DeviceUnavailable(_))
        ));
        assert_eq!(backend.open_sessions(), 0);
    }
}
