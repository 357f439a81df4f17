// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the capture -> filter -> surface pipeline

use retrocam::app::{ImageSurface, LoopState, RenderOutcome};
use retrocam::backends::camera::frame_loop::LoopAction;
use retrocam::backends::camera::{
    BackendResult, CameraBackend, CameraBackendType, CameraDevice, CameraFormat, CaptureSession,
    FrameSender,
};
use retrocam::backends::virtual_camera::VirtualCameraBackend;
use retrocam::{
    CameraError, CameraStreamer, CaptureRequest, FilterRenderer, FilterType, PixelSize,
    PreviewState, QrRenderer, RenderLoop,
};
use std::time::{Duration, Instant};

struct DeniedBackend;

impl CameraBackend for DeniedBackend {
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
        Err(CameraError::PermissionDenied("/dev/video0: Permission denied".to_string()).into())
    }
}

fn request() -> CaptureRequest {
    CaptureRequest {
        device: None,
        format: CameraFormat {
            width: 64,
            height: 48,
        },
    }
}

/// Tick until a frame has been rendered, failing after two seconds
fn render_first_frame(
    streamer: &mut CameraStreamer,
    renderer: &mut FilterRenderer,
    state: &PreviewState,
    surface: &mut ImageSurface,
) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let outcome = renderer.render_tick(streamer.latest_frame(), state, surface);
        if outcome.is_rendered() {
            return;
        }
        assert!(Instant::now() < deadline, "no frame rendered");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_denied_camera_fails_to_start() {
    let err = CameraStreamer::start(&DeniedBackend, &request()).unwrap_err();
    assert!(matches!(err, CameraError::PermissionDenied(_)));
    assert!(err.is_access_denied());
}

#[test]
fn test_missing_file_is_unavailable() {
    let backend = VirtualCameraBackend::file("/nonexistent/retrocam/still.png");
    let err = CameraStreamer::start(&backend, &request()).unwrap_err();
    assert!(matches!(err, CameraError::DeviceUnavailable(_)));
}

#[test]
fn test_filter_change_keeps_capture_running() {
    let backend = VirtualCameraBackend::test_pattern();
    let mut streamer = CameraStreamer::start(&backend, &request()).unwrap();
    let device = streamer.device().cloned();

    let mut renderer = FilterRenderer::new();
    let mut surface = ImageSurface::new();
    let mut state = PreviewState::default();

    render_first_frame(&mut streamer, &mut renderer, &state, &mut surface);
    let received_before = streamer.frames_received();

    state.select_filter(FilterType::Retro);
    state.increase_pixel_size();
    let outcome = renderer.render_tick(streamer.latest_frame(), &state, &mut surface);

    assert_eq!(outcome, RenderOutcome::Rendered { width: 64, height: 48 });
    assert_eq!(state.pixel_size, PixelSize::new(9).unwrap());
    assert_eq!(renderer.intermediate_dimensions(), (7, 5));
    assert!(streamer.is_active());
    assert_eq!(streamer.device().cloned(), device);
    assert_eq!(backend.open_sessions(), 1);
    assert!(streamer.frames_received() >= received_before);
}

#[test]
fn test_teardown_releases_camera_and_stops_loop() {
    let backend = VirtualCameraBackend::test_pattern();
    let mut streamer = CameraStreamer::start(&backend, &request()).unwrap();
    let mut render_loop = RenderLoop::with_refresh_rate(120);
    let cancel = render_loop.cancel_handle();

    let mut renderer = FilterRenderer::new();
    let mut surface = ImageSurface::new();
    let state = PreviewState::new(FilterType::Invert, PixelSize::default());

    for _ in 0..3 {
        render_loop.tick(|| {
            renderer.render_tick(streamer.latest_frame(), &state, &mut surface);
            LoopAction::Continue
        });
    }
    assert_eq!(render_loop.state(), LoopState::Running);
    assert_eq!(backend.open_sessions(), 1);

    drop(render_loop);
    drop(streamer);

    assert!(cancel.is_cancelled());
    assert_eq!(backend.open_sessions(), 0);
}

#[test]
fn test_qr_is_deterministic_across_renderers() {
    let data = "https://example.com/retrocam";
    let mut a = QrRenderer::default();
    let mut b = QrRenderer::default();
    assert_eq!(a.render(data).unwrap(), b.render(data).unwrap());
}
