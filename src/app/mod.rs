// SPDX-License-Identifier: GPL-3.0-only

//! Preview application core
//!
//! - [`state`]: filter selection and pixel size
//! - [`filter_renderer`]: turns the latest frame into a filtered raster
//! - [`render_loop`]: refresh-paced scheduling with cancellation
//! - [`qr_code`]: the QR panel raster

pub mod filter_renderer;
pub mod qr_code;
pub mod render_loop;
pub mod state;

pub use filter_renderer::{DeferReason, FilterRenderer, ImageSurface, RasterSurface, RenderOutcome};
pub use qr_code::{QrMatrix, QrRenderer};
pub use render_loop::{CancelHandle, LoopState, RenderLoop};
pub use state::{FilterType, PixelSize, PreviewState};
