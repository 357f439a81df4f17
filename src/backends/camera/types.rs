// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use crate::errors::CameraError;
use futures::channel::mpsc;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CameraBackendType {
    /// Video4Linux2 capture devices (`/dev/video*`)
    #[default]
    V4l2,
    /// A still image file streamed as a looping camera
    File,
    /// Synthetic animated colour bars
    TestPattern,
}

impl CameraBackendType {
    pub const ALL: [CameraBackendType; 3] = [
        CameraBackendType::V4l2,
        CameraBackendType::File,
        CameraBackendType::TestPattern,
    ];
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::File => write!(f, "file"),
            CameraBackendType::TestPattern => write!(f, "test pattern"),
        }
    }
}

impl std::str::FromStr for CameraBackendType {
    type Err = String;

    /// Accepts the same kebab-case names as the config file
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v4l2" => Ok(CameraBackendType::V4l2),
            "file" => Ok(CameraBackendType::File),
            "test-pattern" => Ok(CameraBackendType::TestPattern),
            other => Err(format!(
                "unknown backend '{}' (expected v4l2, file or test-pattern)",
                other
            )),
        }
    }
}

/// Represents a camera device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Human readable name (V4L2 card name, file name, ...)
    pub name: String,
    /// Path used to open the device
    pub path: String,
    /// Driver name, when the backend knows it
    pub driver: Option<String>,
}

/// Requested capture geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
}

impl Default for CameraFormat {
    fn default() -> Self {
        Self {
            width: crate::constants::capture::DEFAULT_WIDTH,
            height: crate::constants::capture::DEFAULT_HEIGHT,
        }
    }
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single RGBA frame from a capture session
///
/// The pixel data is shared, so cloning a frame is cheap and the renderer
/// never mutates what the camera produced.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (at least `width * 4`)
    pub stride: u32,
    /// Monotonic counter assigned by the capture session
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, sequence: u64) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            stride: width * 4,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Frames with a zero dimension are not ready to draw
    pub fn is_ready(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// RGBA value at `(x, y)`, or `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.stride + x * 4) as usize;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Copy the frame into `target`, dropping any row padding.
    ///
    /// Returns `false` when the data is shorter than the declared geometry.
    pub fn copy_into(&self, target: &mut RgbaImage) -> bool {
        let row_bytes = (self.width * 4) as usize;
        let stride = self.stride as usize;
        let needed = stride * (self.height as usize).saturating_sub(1) + row_bytes;
        if self.data.len() < needed || stride < row_bytes {
            return false;
        }

        crate::media::retro::ensure_dimensions(target, self.width, self.height);
        let dst: &mut [u8] = target;
        if stride == row_bytes {
            dst.copy_from_slice(&self.data[..row_bytes * self.height as usize]);
        } else {
            for (row, chunk) in dst.chunks_exact_mut(row_bytes).enumerate() {
                let start = row * stride;
                chunk.copy_from_slice(&self.data[start..start + row_bytes]);
            }
        }
        true
    }

    /// Owned `RgbaImage` copy of the frame
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let mut image = RgbaImage::new(0, 0);
        self.copy_into(&mut image).then_some(image)
    }
}

/// Frame sender type
pub type FrameSender = mpsc::Sender<CameraFrame>;

/// Frame receiver type
pub type FrameReceiver = mpsc::Receiver<CameraFrame>;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone)]
pub enum BackendError {
    /// Acquiring the device failed
    Camera(CameraError),
    /// Format not supported
    FormatNotSupported(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Camera(err) => write!(f, "{}", err),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<CameraError> for BackendError {
    fn from(err: CameraError) -> Self {
        BackendError::Camera(err)
    }
}

impl From<BackendError> for CameraError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Camera(inner) => inner,
            BackendError::FormatNotSupported(msg) => CameraError::InvalidFormat(msg),
        }
    }
}
