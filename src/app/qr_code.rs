// SPDX-License-Identifier: GPL-3.0-only

//! QR code panel
//!
//! Encoding is delegated to the `qrcode` crate; this module only turns the
//! module matrix into a hard-edged raster and avoids re-encoding when the
//! string has not changed.

use crate::constants::qr;
use crate::errors::QrError;
use image::{Rgba, RgbaImage};
use qrcode::{Color, QrCode};
use tracing::debug;

const DARK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const LIGHT: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Square grid of dark/light modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrMatrix {
    size: usize,
    modules: Vec<bool>,
}

impl QrMatrix {
    /// Encode `data` into a module matrix. Deterministic for a given input.
    pub fn encode(data: &str) -> Result<Self, QrError> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| match e {
            qrcode::types::QrError::DataTooLong => QrError::DataTooLong(data.len()),
            other => QrError::Encoding(other.to_string()),
        })?;

        let modules = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
        Ok(Self {
            size: code.width(),
            modules,
        })
    }

    /// Modules per side, without quiet zone
    pub fn size(&self) -> usize {
        self.size
    }

    /// Modules per side including the quiet zone on both edges
    pub fn side_with_quiet_zone(&self) -> usize {
        self.size + 2 * qr::QUIET_ZONE_MODULES
    }

    /// Whether the module at `(x, y)` is dark; out of range counts as light
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size && self.modules[y * self.size + x]
    }

    /// Draw the matrix into `target`, scaled to fill it with nearest-neighbour
    /// sampling and surrounded by the standard quiet zone.
    pub fn rasterize_into(&self, target: &mut RgbaImage) {
        let (width, height) = target.dimensions();
        let total = self.side_with_quiet_zone();

        for (px, py, pixel) in target.enumerate_pixels_mut() {
            let mx = px as usize * total / width as usize;
            let my = py as usize * total / height as usize;
            let dark = mx >= qr::QUIET_ZONE_MODULES
                && my >= qr::QUIET_ZONE_MODULES
                && self.is_dark(mx - qr::QUIET_ZONE_MODULES, my - qr::QUIET_ZONE_MODULES);
            *pixel = if dark { DARK } else { LIGHT };
        }
    }
}

/// Renders a string as a fixed-size QR raster, re-encoding only on change
#[derive(Debug)]
pub struct QrRenderer {
    width: u32,
    height: u32,
    data: Option<String>,
    raster: RgbaImage,
    renders: u64,
}

impl QrRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            data: None,
            raster: RgbaImage::new(0, 0),
            renders: 0,
        }
    }

    /// Renderer at one pixel per module for `data`, already holding its
    /// raster. Encodes once.
    pub fn pixel_per_module(data: &str) -> Result<Self, QrError> {
        let matrix = QrMatrix::encode(data)?;
        let side = matrix.side_with_quiet_zone() as u32;
        let mut renderer = Self::new(side, side);
        renderer.store(data, &matrix);
        Ok(renderer)
    }

    /// Raster for `data`; cached until `data` changes
    pub fn render(&mut self, data: &str) -> Result<&RgbaImage, QrError> {
        if self.data.as_deref() != Some(data) {
            let matrix = QrMatrix::encode(data)?;
            self.store(data, &matrix);
        }
        Ok(&self.raster)
    }

    fn store(&mut self, data: &str, matrix: &QrMatrix) {
        let mut raster = RgbaImage::new(self.width, self.height);
        matrix.rasterize_into(&mut raster);

        self.raster = raster;
        self.data = Some(data.to_string());
        self.renders += 1;
        debug!(
            modules = matrix.size(),
            width = self.width,
            height = self.height,
            "QR code rendered"
        );
    }

    /// Last successfully rendered raster
    pub fn raster(&self) -> Option<&RgbaImage> {
        self.data.as_ref().map(|_| &self.raster)
    }

    /// The string currently rendered
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Number of times the matrix was actually encoded
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Default for QrRenderer {
    fn default() -> Self {
        Self::new(qr::DEFAULT_WIDTH, qr::DEFAULT_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/";

    fn decode(image: &RgbaImage) -> Option<String> {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
                image.get_pixel(x as u32, y as u32).0[0]
            });
        prepared
            .detect_grids()
            .first()
            .and_then(|g| g.decode().ok())
            .map(|(_, content)| content)
    }

    #[test]
    fn test_encode_is_deterministic() {
        assert_eq!(QrMatrix::encode(URL).unwrap(), QrMatrix::encode(URL).unwrap());
    }

    #[test]
    fn test_default_size() {
        let mut renderer = QrRenderer::default();
        let raster = renderer.render(URL).unwrap();
        assert_eq!(raster.dimensions(), (128, 128));
    }

    #[test]
    fn test_raster_has_hard_edges() {
        let mut renderer = QrRenderer::default();
        let raster = renderer.render(URL).unwrap();
        assert!(raster.pixels().all(|p| *p == DARK || *p == LIGHT));
        // Quiet zone corner is light, top-left finder pattern is dark
        assert_eq!(*raster.get_pixel(0, 0), LIGHT);
        let matrix = QrMatrix::encode(URL).unwrap();
        assert!(matrix.is_dark(0, 0));
    }

    #[test]
    fn test_rerender_only_on_change() {
        let mut renderer = QrRenderer::default();
        renderer.render(URL).unwrap();
        renderer.render(URL).unwrap();
        renderer.render(URL).unwrap();
        assert_eq!(renderer.render_count(), 1);

        renderer.render("https://example.com/other").unwrap();
        assert_eq!(renderer.render_count(), 2);
        assert_eq!(renderer.data(), Some("https://example.com/other"));
    }

    #[test]
    fn test_pixel_per_module_encodes_once() {
        let mut renderer = QrRenderer::pixel_per_module(URL).unwrap();
        let side = QrMatrix::encode(URL).unwrap().side_with_quiet_zone() as u32;
        assert_eq!(renderer.dimensions(), (side, side));
        assert_eq!(renderer.render_count(), 1);
        assert_eq!(renderer.raster().map(|r| r.dimensions()), Some((side, side)));

        renderer.render(URL).unwrap();
        assert_eq!(renderer.render_count(), 1);
    }

    #[test]
    fn test_raster_scans_back() {
        let matrix = QrMatrix::encode(URL).unwrap();
        let side = (matrix.side_with_quiet_zone() * 8) as u32;
        let mut renderer = QrRenderer::new(side, side);
        let raster = renderer.render(URL).unwrap();
        assert_eq!(decode(raster).as_deref(), Some(URL));
    }

    #[test]
    fn test_oversized_payload() {
        let huge = "x".repeat(8000);
        let mut renderer = QrRenderer::default();
        assert!(matches!(renderer.render(&huge), Err(QrError::DataTooLong(8000))));
        assert!(renderer.raster().is_none());
        assert_eq!(renderer.render_count(), 0);
    }
}
