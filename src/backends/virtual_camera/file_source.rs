// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources that need no hardware: still image files and a
//! synthetic test pattern.

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraDevice, CameraFormat, CameraFrame,
};
use crate::constants::file_formats;
use crate::errors::CameraError;
use image::RgbaImage;
use std::path::Path;
use tracing::debug;

/// Classic SMPTE-style bar colours, left to right
const BARS: [[u8; 3]; 8] = [
    [192, 192, 192],
    [192, 192, 0],
    [0, 192, 192],
    [0, 192, 0],
    [192, 0, 192],
    [192, 0, 0],
    [0, 0, 192],
    [16, 16, 16],
];

/// Describe a still image as a camera device
pub fn file_device(path: &Path) -> CameraDevice {
    CameraDevice {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
        path: path.display().to_string(),
        driver: Some("file".to_string()),
    }
}

/// The test pattern device
pub fn test_pattern_device() -> CameraDevice {
    CameraDevice {
        name: "Test pattern".to_string(),
        path: "pattern:bars".to_string(),
        driver: Some("pattern".to_string()),
    }
}

/// Load a still image as one RGBA frame
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) => {
            BackendError::Camera(crate::errors::camera_error_from_io(
                &path.display().to_string(),
                &io,
            ))
        }
        other => BackendError::Camera(CameraError::InvalidFormat(other.to_string())),
    })?;

    let rgba = image.to_rgba8();
    debug!(
        path = %path.display(),
        width = rgba.width(),
        height = rgba.height(),
        "Loaded image source"
    );
    Ok(frame_from_image(rgba, 0))
}

/// Wrap an `RgbaImage` as a frame
pub fn frame_from_image(image: RgbaImage, sequence: u64) -> CameraFrame {
    let (width, height) = image.dimensions();
    CameraFrame::from_rgba(width, height, image.into_raw(), sequence)
}

/// Colour bars that scroll one bar width every 32 frames
pub fn test_pattern_frame(format: &CameraFormat, sequence: u64) -> CameraFrame {
    let CameraFormat { width, height } = *format;
    let bar_width = (width / BARS.len() as u32).max(1);
    let shift = ((sequence % 32) * bar_width as u64 / 32) as u32;

    let image = RgbaImage::from_fn(width, height, |x, y| {
        // Bottom eighth is a horizontal grey ramp
        if y >= height - height / 8 {
            let v = (x * 255 / width.max(1)) as u8;
            return image::Rgba([v, v, v, 255]);
        }
        let bar = (((x + shift) / bar_width) as usize) % BARS.len();
        let [r, g, b] = BARS[bar];
        image::Rgba([r, g, b, 255])
    });

    frame_from_image(image, sequence)
}
