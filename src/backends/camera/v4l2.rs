// SPDX-License-Identifier: GPL-3.0-only

//! Direct V4L2 capture
//!
//! Devices are opened on the caller's thread so that permission and
//! availability problems are reported synchronously; streaming then runs
//! on a capture thread that owns the device until the session is released.

use super::format_converters::SourceFormat;
use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::*;
use super::{CameraBackend, CaptureSession};
use crate::constants::capture;
use crate::errors::{CameraError, camera_error_from_io, is_disconnect};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// V4L2 backend over `/dev/video*`
#[derive(Debug, Default)]
pub struct V4l2Backend;

impl V4l2Backend {
    pub fn new() -> Self {
        Self
    }
}

/// Video nodes under `/dev`, sorted by name
fn video_node_paths() -> Vec<PathBuf> {
    let mut paths: Vec<_> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("video"))
        })
        .collect();
    paths.sort();
    paths
}

/// Query a node and keep it only if it can capture video
///
/// Failing to open the node is an error; a node that opens but is not a
/// capture device (metadata, output) is `Ok(None)`.
fn query_capture_device(path: &Path) -> io::Result<Option<CameraDevice>> {
    let dev = Device::with_path(path)?;
    let caps = match dev.query_caps() {
        Ok(caps) => caps,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping node without capabilities");
            return Ok(None);
        }
    };
    if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
        return Ok(None);
    }
    Ok(Some(CameraDevice {
        name: caps.card,
        path: path.to_string_lossy().to_string(),
        driver: Some(caps.driver),
    }))
}

/// Capture devices among `paths`
///
/// If no capture device was found but some node failed to open, that first
/// failure is returned, so a node the user may not open reads as
/// `PermissionDenied` rather than an empty list.
fn scan_capture_devices<F>(
    paths: &[PathBuf],
    mut query: F,
) -> Result<Vec<CameraDevice>, CameraError>
where
    F: FnMut(&Path) -> io::Result<Option<CameraDevice>>,
{
    let mut devices = Vec::new();
    let mut first_failure = None;

    for path in paths {
        match query(path) {
            Ok(Some(device)) => devices.push(device),
            Ok(None) => {}
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cannot open video node");
                let path = path.to_string_lossy();
                first_failure.get_or_insert_with(|| camera_error_from_io(&path, &e));
            }
        }
    }

    match first_failure {
        Some(err) if devices.is_empty() => Err(err),
        _ => Ok(devices),
    }
}

/// The device `open(None, ..)` acquires: the first capture node
fn first_capture_device<F>(paths: &[PathBuf], query: F) -> Result<CameraDevice, CameraError>
where
    F: FnMut(&Path) -> io::Result<Option<CameraDevice>>,
{
    scan_capture_devices(paths, query)?
        .into_iter()
        .next()
        .ok_or_else(|| CameraError::DeviceUnavailable("No V4L2 capture devices found".to_string()))
}

/// Why a dequeue failure ends the session, or `None` to retry
///
/// A timed-out dequeue leaves its buffer index queued, and the next
/// `next()` would queue it a second time, so a timeout ends the session too.
fn dequeue_failure(err: &io::Error) -> Option<CameraError> {
    if err.kind() == io::ErrorKind::TimedOut || is_disconnect(err) {
        Some(CameraError::Disconnected)
    } else {
        None
    }
}

/// Pick the first preferred format the device lists
fn negotiate_format(
    dev: &Device,
    path: &str,
    requested: &CameraFormat,
) -> BackendResult<(SourceFormat, CameraFormat)> {
    let offered: Vec<FourCC> = dev
        .enum_formats()
        .map_err(|e| BackendError::Camera(camera_error_from_io(path, &e)))?
        .into_iter()
        .map(|desc| desc.fourcc)
        .collect();

    let source = SourceFormat::PREFERRED
        .into_iter()
        .find(|f| offered.contains(&FourCC::new(&f.fourcc())))
        .ok_or_else(|| {
            BackendError::FormatNotSupported(format!(
                "{} offers none of YUYV, MJPG, RGB3, GREY ({:?})",
                path, offered
            ))
        })?;

    let mut format = dev
        .format()
        .map_err(|e| BackendError::Camera(camera_error_from_io(path, &e)))?;
    format.width = requested.width;
    format.height = requested.height;
    format.fourcc = FourCC::new(&source.fourcc());

    let actual = dev
        .set_format(&format)
        .map_err(|e| BackendError::Camera(camera_error_from_io(path, &e)))?;

    let actual_source = SourceFormat::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
        BackendError::FormatNotSupported(format!("{} switched to {}", path, actual.fourcc))
    })?;

    if actual.width != requested.width || actual.height != requested.height {
        debug!(
            path,
            requested = %requested,
            width = actual.width,
            height = actual.height,
            "Device adjusted the requested resolution"
        );
    }

    Ok((
        actual_source,
        CameraFormat {
            width: actual.width,
            height: actual.height,
        },
    ))
}

impl CameraBackend for V4l2Backend {
    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }

    fn enumerate_cameras(&self) -> Vec<CameraDevice> {
        scan_capture_devices(&video_node_paths(), query_capture_device).unwrap_or_else(|e| {
            warn!(error = %e, "No V4L2 node could be opened");
            Vec::new()
        })
    }

    fn open(
        &self,
        device: Option<&CameraDevice>,
        format: &CameraFormat,
        sender: FrameSender,
    ) -> BackendResult<Box<dyn CaptureSession>> {
        let device = match device {
            Some(device) => device.clone(),
            None => first_capture_device(&video_node_paths(), query_capture_device)?,
        };

        info!(path = %device.path, name = %device.name, "Opening V4L2 device");

        let dev = Device::with_path(&device.path)
            .map_err(|e| BackendError::Camera(camera_error_from_io(&device.path, &e)))?;
        let (source, negotiated) = negotiate_format(&dev, &device.path, format)?;

        let mut stream =
            MmapStream::with_buffers(&dev, Type::VideoCapture, capture::V4L2_BUFFER_COUNT)
                .map_err(|e| BackendError::Camera(camera_error_from_io(&device.path, &e)))?;
        stream.set_timeout(capture::DEQUEUE_TIMEOUT);

        info!(
            path = %device.path,
            format = ?source,
            resolution = %negotiated,
            "V4L2 stream ready"
        );

        let fault = Arc::new(OnceLock::new());
        let controller = spawn_capture_loop(
            dev,
            stream,
            source,
            negotiated,
            sender,
            Arc::clone(&fault),
        );

        Ok(Box::new(V4l2Session {
            device,
            format: negotiated,
            controller: Some(controller),
            fault,
        }))
    }
}

struct CaptureState {
    // Declared first so buffers are unmapped before the fd closes
    stream: MmapStream<'static>,
    _device: Device,
    sender: FrameSender,
    sequence: u64,
    /// Dequeue failures since the last good frame
    failures: u32,
    fault: Arc<OnceLock<CameraError>>,
}

fn spawn_capture_loop(
    device: Device,
    stream: MmapStream<'static>,
    source: SourceFormat,
    format: CameraFormat,
    sender: FrameSender,
    fault: Arc<OnceLock<CameraError>>,
) -> CaptureLoopController {
    let CameraFormat { width, height } = format;

    CaptureLoopController::start_with_init(
        "v4l2-capture",
        move || {
            Ok(CaptureState {
                stream,
                _device: device,
                sender,
                sequence: 0,
                failures: 0,
                fault,
            })
        },
        move |state| {
            let captured_at = Instant::now();
            let rgba = match state.stream.next() {
                Ok((buf, meta)) => {
                    let used = match meta.bytesused as usize {
                        0 => buf.len(),
                        n => n.min(buf.len()),
                    };
                    source.to_rgba(&buf[..used], width, height)
                }
                Err(e) => {
                    state.failures += 1;
                    let fatal = dequeue_failure(&e).or_else(|| {
                        (state.failures >= capture::MAX_DEQUEUE_FAILURES).then(|| {
                            CameraError::InitializationFailed(format!(
                                "{} consecutive dequeue failures, last: {}",
                                state.failures, e
                            ))
                        })
                    });
                    if let Some(err) = fatal {
                        warn!(error = %e, reason = %err, "V4L2 stream ended");
                        let _ = state.fault.set(err);
                        return LoopAction::Stop;
                    }
                    warn!(error = %e, "Failed to dequeue V4L2 buffer");
                    std::thread::sleep(capture::RETRY_DELAY);
                    return LoopAction::Continue;
                }
            };
            state.failures = 0;

            let data = match rgba {
                Ok(data) => data,
                Err(e) => {
                    debug!(error = %e, "Dropping undecodable frame");
                    return LoopAction::Continue;
                }
            };

            let frame = CameraFrame {
                width,
                height,
                data: Arc::from(data),
                stride: width * 4,
                sequence: state.sequence,
                captured_at,
            };
            state.sequence += 1;

            if state.sequence % capture::FRAME_LOG_INTERVAL == 0 {
                debug!(
                    sequence = state.sequence,
                    elapsed_us = captured_at.elapsed().as_micros(),
                    "V4L2 frame captured"
                );
            }

            match state.sender.try_send(frame) {
                Ok(()) => LoopAction::Continue,
                Err(e) if e.is_disconnected() => LoopAction::Stop,
                // Renderer is behind; it only wants the newest frame anyway
                Err(_) => LoopAction::Continue,
            }
        },
    )
}

/// An open V4L2 device
pub struct V4l2Session {
    device: CameraDevice,
    format: CameraFormat,
    controller: Option<CaptureLoopController>,
    fault: Arc<OnceLock<CameraError>>,
}

impl CaptureSession for V4l2Session {
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

    fn fault(&self) -> Option<CameraError> {
        self.fault.get().cloned()
    }

    fn release(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            info!(path = %self.device.path, "Releasing V4L2 device");
            controller.stop();
        }
    }
}

impl Drop for V4l2Session {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> PathBuf {
        PathBuf::from("/dev").join(name)
    }

    fn camera(path: &Path) -> CameraDevice {
        CameraDevice {
            name: "Test Camera".to_string(),
            path: path.to_string_lossy().to_string(),
            driver: Some("uvcvideo".to_string()),
        }
    }

    #[test]
    fn test_unopenable_nodes_report_permission_denied() {
        let paths = [node("video0"), node("video1")];
        let err = first_capture_device(&paths, |_| {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        })
        .unwrap_err();

        assert!(matches!(err, CameraError::PermissionDenied(ref msg) if msg.starts_with("/dev/video0")));
        assert!(err.is_access_denied());
    }

    #[test]
    fn test_no_nodes_is_unavailable() {
        let err = first_capture_device(&[], |p| Ok(Some(camera(p)))).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_only_metadata_nodes_is_unavailable() {
        let paths = [node("video0"), node("video1")];
        let err = first_capture_device(&paths, |_| Ok(None)).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_openable_capture_node_wins_over_failures() {
        let paths = [node("video0"), node("video2")];
        let device = first_capture_device(&paths, |p| {
            if p.ends_with("video0") {
                Err(io::Error::from_raw_os_error(libc::EBUSY))
            } else {
                Ok(Some(camera(p)))
            }
        })
        .unwrap();
        assert_eq!(device.path, "/dev/video2");
    }

    #[test]
    fn test_missing_node_on_disk_is_unavailable() {
        let paths = [PathBuf::from("/nonexistent/retrocam/video0")];
        let err = first_capture_device(&paths, query_capture_device).unwrap_err();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_unplug_ends_the_stream() {
        for errno in [libc::ENODEV, libc::EIO, libc::ENXIO] {
            let err = io::Error::from_raw_os_error(errno);
            assert_eq!(dequeue_failure(&err), Some(CameraError::Disconnected));
        }
    }

    #[test]
    fn test_stalled_dequeue_ends_the_stream() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "VIDIOC_DQBUF");
        assert_eq!(dequeue_failure(&err), Some(CameraError::Disconnected));
    }

    #[test]
    fn test_interrupted_dequeue_is_retried() {
        assert_eq!(dequeue_failure(&io::Error::from_raw_os_error(libc::EINTR)), None);
        assert_eq!(dequeue_failure(&io::Error::from_raw_os_error(libc::EAGAIN)), None);
    }
}
