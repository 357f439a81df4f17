// SPDX-License-Identifier: MPL-2.0

//! retrocam - a live camera preview with colour filters, a retro pixel-art
//! effect and a QR code panel
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Preview state, per-tick filter rendering, render loop, QR panel
//! - [`backends`]: Camera acquisition (V4L2, file and test-pattern sources)
//! - [`media`]: Colour matrices and the retro mosaic/posterize pipeline
//! - [`config`]: User configuration handling
//! - [`terminal`]: Interactive terminal preview
//!
//! # Example
//!
//! ```ignore
//! // Run the interactive preview:
//! // retrocam
//! // or render the QR panel on its own:
//! // retrocam qr "https://example.com/"
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod i18n;
pub mod media;
pub mod terminal;

// Re-export commonly used types
pub use app::{FilterRenderer, FilterType, PixelSize, PreviewState, QrRenderer, RenderLoop};
pub use backends::camera::{CameraFrame, CameraStreamer, CaptureRequest};
pub use config::Config;
pub use errors::{AppError, AppResult, CameraError};
