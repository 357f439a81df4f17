// SPDX-License-Identifier: MPL-2.0

//! Pixel processing for the preview
//!
//! - [`color_matrix`]: fixed 4x5 colour matrices (grayscale, sepia, invert)
//!   and the staged retro grade, applied uniformly per pixel
//! - [`retro`]: the mosaic + posterize pipeline

pub mod color_matrix;
pub mod retro;

pub use color_matrix::{ColorGrade, ColorMatrix};
pub use retro::{intermediate_dimensions, posterize, posterize_channel, render_retro};
