// SPDX-License-Identifier: GPL-3.0-only

//! Per-tick filtered rendering of the latest camera frame

use super::state::{FilterType, PreviewState};
use crate::backends::camera::CameraFrame;
use crate::media::retro;
use image::RgbaImage;
use tracing::trace;

/// Something the renderer can draw a finished raster onto
pub trait RasterSurface {
    /// `false` while the surface has nowhere to draw (e.g. zero-sized area)
    fn is_ready(&self) -> bool {
        true
    }

    /// Replace the surface contents with `image`
    fn present(&mut self, image: &RgbaImage);
}

/// In-memory surface keeping the last presented raster
#[derive(Debug, Default, Clone)]
pub struct ImageSurface {
    image: Option<RgbaImage>,
    presented: u64,
}

impl ImageSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last presented raster
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// How many times something was presented
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl RasterSurface for ImageSurface {
    fn present(&mut self, image: &RgbaImage) {
        match &mut self.image {
            Some(existing) if existing.dimensions() == image.dimensions() => {
                existing.copy_from_slice(image);
            }
            slot => *slot = Some(image.clone()),
        }
        self.presented += 1;
    }
}

/// Why a tick drew nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// No frame has arrived yet
    NoFrame,
    /// The frame has a zero dimension or truncated data
    FrameNotReady,
    /// The surface cannot be drawn on right now
    SurfaceNotReady,
}

/// Result of one render tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A raster of the frame's size was presented
    Rendered { width: u32, height: u32 },
    /// Nothing was drawn; try again next tick
    Deferred(DeferReason),
}

impl RenderOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, RenderOutcome::Rendered { .. })
    }
}

/// Turns camera frames into filtered rasters
///
/// Owns the scratch buffers so steady-state ticks do not allocate.
#[derive(Debug, Default)]
pub struct FilterRenderer {
    source: RgbaImage,
    intermediate: RgbaImage,
    output: RgbaImage,
}

impl FilterRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render one tick
    ///
    /// Unready input is never an error: the tick is deferred and the caller
    /// simply tries again on the next one.
    pub fn render_tick(
        &mut self,
        frame: Option<&CameraFrame>,
        state: &PreviewState,
        surface: &mut dyn RasterSurface,
    ) -> RenderOutcome {
        if !surface.is_ready() {
            trace!("Surface not ready, deferring tick");
            return RenderOutcome::Deferred(DeferReason::SurfaceNotReady);
        }
        let Some(frame) = frame else {
            return RenderOutcome::Deferred(DeferReason::NoFrame);
        };
        if !frame.is_ready() || !frame.copy_into(&mut self.source) {
            trace!(
                width = frame.width,
                height = frame.height,
                "Frame not ready, deferring tick"
            );
            return RenderOutcome::Deferred(DeferReason::FrameNotReady);
        }

        let raster = self.filter_source(state);
        surface.present(raster);

        RenderOutcome::Rendered {
            width: frame.width,
            height: frame.height,
        }
    }

    /// Filter an image outside the tick loop (snapshots, file input)
    pub fn render_image(&mut self, image: &RgbaImage, state: &PreviewState) -> RgbaImage {
        retro::ensure_dimensions(&mut self.source, image.width(), image.height());
        self.source.copy_from_slice(image);
        self.filter_source(state).clone()
    }

    fn filter_source(&mut self, state: &PreviewState) -> &RgbaImage {
        match (state.filter, state.filter.color_grade()) {
            (FilterType::Retro, Some(grade)) => {
                retro::render_retro(
                    &self.source,
                    state.pixel_size.get() as u32,
                    &grade,
                    &mut self.intermediate,
                    &mut self.output,
                );
                &self.output
            }
            (_, Some(grade)) => {
                retro::ensure_dimensions(&mut self.output, self.source.width(), self.source.height());
                self.output.copy_from_slice(&self.source);
                grade.apply_in_place(&mut self.output);
                &self.output
            }
            (_, None) => &self.source,
        }
    }

    /// Size of the retro intermediate buffer after the last retro tick
    pub fn intermediate_dimensions(&self) -> (u32, u32) {
        self.intermediate.dimensions()
    }
}
