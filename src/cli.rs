// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Taking filtered snapshots
//! - Rendering the QR code
//! - Running the render loop headless

use chrono::Local;
use crossterm::style::{Color, Stylize};
use retrocam::app::{FilterRenderer, ImageSurface, QrMatrix, QrRenderer, RenderLoop, RenderOutcome};
use retrocam::backends::camera::frame_loop::LoopAction;
use retrocam::backends::camera::{CameraStreamer, backend_from_config};
use retrocam::constants::{app_info, file_formats, timing};
use retrocam::{AppError, AppResult, CameraFrame, Config};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// List all cameras of the configured backend
pub fn list_cameras(config: &Config) -> AppResult<()> {
    let backend = backend_from_config(config);
    let cameras = backend.enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found ({} backend).", backend.backend_type());
        return Ok(());
    }

    println!("Available cameras ({} backend):", backend.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.name);
        println!("      Path: {}", camera.path);
        if let Some(driver) = &camera.driver {
            println!("      Driver: {}", driver);
        }
        println!();
    }

    Ok(())
}

/// Capture one frame, apply the configured filter and save it
pub fn take_snapshot(config: &Config, output: Option<PathBuf>) -> AppResult<()> {
    let backend = backend_from_config(config);
    let request = config.capture_request(backend.as_ref());
    let mut streamer = CameraStreamer::start(backend.as_ref(), &request)?;

    if let Some(device) = streamer.device() {
        println!("Using camera: {}", device.name);
    }

    println!("Capturing...");
    let frame = wait_for_frame(&mut streamer).ok_or("No frame arrived from the camera")?;
    // Release the device before encoding
    streamer.stop();

    let image = frame.to_rgba_image().ok_or("Camera delivered an incomplete frame")?;
    let state = config.preview_state();
    let filtered = FilterRenderer::new().render_image(&image, &state);

    let path = snapshot_path(output)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    filtered.save(&path)?;

    info!(path = %path.display(), filter = %state.filter, "Snapshot saved");
    println!("Snapshot saved: {}", path.display());
    Ok(())
}

/// First frame from the streamer, or `None` after the timeout
fn wait_for_frame(streamer: &mut CameraStreamer) -> Option<CameraFrame> {
    let start = Instant::now();
    while start.elapsed() < timing::FIRST_FRAME_TIMEOUT {
        if let Some(frame) = streamer.latest_frame()
            && frame.is_ready()
        {
            return Some(frame.clone());
        }
        std::thread::sleep(timing::FIRST_FRAME_POLL);
    }
    None
}

/// Resolve the snapshot destination
///
/// A directory gets a timestamped file name; a file must have an image
/// extension the encoder knows.
fn snapshot_path(output: Option<PathBuf>) -> AppResult<PathBuf> {
    let timestamped = |dir: &Path| {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        dir.join(format!("IMG_{}.png", timestamp))
    };

    match output {
        Some(path) if path.is_dir() => Ok(timestamped(&path)),
        Some(path) => {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if file_formats::is_image_extension(&ext) {
                Ok(path)
            } else {
                Err(format!("Unsupported image extension: {}", path.display()).into())
            }
        }
        None => Ok(timestamped(&get_default_snapshot_dir())),
    }
}

/// Get default snapshot directory
fn get_default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(app_info::SNAPSHOT_DIR)
}

/// Render the QR code for `config.qr_data` to a file or the terminal
pub fn render_qr(
    config: &Config,
    output: Option<PathBuf>,
    size: Option<u32>,
) -> AppResult<()> {
    match output {
        Some(path) => {
            let size = size.unwrap_or(config.qr_size);
            let mut renderer = QrRenderer::new(size, size);
            renderer.render(&config.qr_data)?.save(&path)?;
            println!("QR code saved: {}", path.display());
        }
        None => print_qr(&QrMatrix::encode(&config.qr_data)?),
    }
    Ok(())
}

/// Print the matrix with half-blocks, two module rows per line
fn print_qr(matrix: &QrMatrix) {
    let side = matrix.side_with_quiet_zone();
    let quiet = (side - matrix.size()) / 2;
    let dark = |x: usize, y: usize| {
        x >= quiet && y >= quiet && matrix.is_dark(x - quiet, y - quiet)
    };
    let color = |is_dark: bool| if is_dark { Color::Black } else { Color::White };

    for y in (0..side).step_by(2) {
        let line: String = (0..side)
            .map(|x| {
                "▀"
                    .with(color(dark(x, y)))
                    .on(color(dark(x, y + 1)))
                    .to_string()
            })
            .collect();
        println!("{}", line);
    }
}

/// Run the render loop without a display, until `ticks` or Ctrl+C
pub fn stream(config: &Config, ticks: Option<u64>) -> AppResult<()> {
    let backend = backend_from_config(config);
    let request = config.capture_request(backend.as_ref());
    let mut streamer = CameraStreamer::start(backend.as_ref(), &request)?;

    let mut render_loop = RenderLoop::with_refresh_rate(config.refresh_rate());
    let cancel = render_loop.cancel_handle();
    ctrlc::set_handler(move || cancel.cancel())
        .map_err(|e| AppError::Other(format!("Failed to install Ctrl+C handler: {}", e)))?;

    println!("Streaming... (press Ctrl+C to stop)");

    let state = config.preview_state();
    let mut renderer = FilterRenderer::new();
    let mut surface = ImageSurface::new();
    let mut rendered = 0u64;
    let mut deferred = 0u64;
    let mut tick = 0u64;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    rt.block_on(render_loop.run(|| {
        let frame = streamer.latest_frame();
        match renderer.render_tick(frame, &state, &mut surface) {
            RenderOutcome::Rendered { .. } => rendered += 1,
            RenderOutcome::Deferred(_) => deferred += 1,
        }

        tick += 1;
        if tick % timing::TICK_LOG_INTERVAL == 0 {
            info!(tick, rendered, deferred, "Stream statistics");
        }
        if ticks.is_some_and(|limit| tick >= limit) {
            LoopAction::Stop
        } else {
            LoopAction::Continue
        }
    }));

    streamer.stop();
    println!(
        "Stopped after {} ticks: {} rendered, {} deferred",
        tick, rendered, deferred
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_path_rejects_unknown_extension() {
        let err = snapshot_path(Some(PathBuf::from("/tmp/out.xyz"))).unwrap_err();
        assert!(matches!(err, AppError::Other(ref msg) if msg.contains("out.xyz")));
        assert_eq!(
            snapshot_path(Some(PathBuf::from("/tmp/out.jpg"))).unwrap(),
            PathBuf::from("/tmp/out.jpg")
        );
    }

    #[test]
    fn test_snapshot_path_in_directory() {
        let dir = std::env::temp_dir();
        let path = snapshot_path(Some(dir.clone())).unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("IMG_"));
    }
}
