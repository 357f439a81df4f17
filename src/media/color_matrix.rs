// SPDX-License-Identifier: GPL-3.0-only

//! 4x5 colour matrices
//!
//! Each row produces one output channel (R, G, B, A) from the normalized
//! input channels plus a constant offset in the fifth column, the same
//! layout as SVG `feColorMatrix`. The CSS filter functions used by the
//! preview are all expressible this way. A [`ColorGrade`] chains several of
//! them and clamps to `[0, 1]` after every stage, as a CSS filter list does.

use crate::constants::retro;
use image::RgbaImage;

/// Row-major 4x5 colour matrix operating on channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix {
    rows: [[f32; 5]; 4],
}

impl ColorMatrix {
    /// Matrix that leaves every pixel unchanged
    pub const IDENTITY: ColorMatrix = ColorMatrix {
        rows: [
            [1.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0, 0.0],
        ],
    };

    pub const fn from_rows(rows: [[f32; 5]; 4]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f32; 5]; 4] {
        &self.rows
    }

    /// Luminance grayscale (`grayscale(amount)`)
    pub fn grayscale(amount: f32) -> Self {
        let a = 1.0 - amount.clamp(0.0, 1.0);
        Self::rgb(
            [
                [0.2126 + 0.7874 * a, 0.7152 - 0.7152 * a, 0.0722 - 0.0722 * a],
                [0.2126 - 0.2126 * a, 0.7152 + 0.2848 * a, 0.0722 - 0.0722 * a],
                [0.2126 - 0.2126 * a, 0.7152 - 0.7152 * a, 0.0722 + 0.9278 * a],
            ],
            0.0,
        )
    }

    /// Sepia tone (`sepia(amount)`)
    pub fn sepia(amount: f32) -> Self {
        let a = 1.0 - amount.clamp(0.0, 1.0);
        Self::rgb(
            [
                [0.393 + 0.607 * a, 0.769 - 0.769 * a, 0.189 - 0.189 * a],
                [0.349 - 0.349 * a, 0.686 + 0.314 * a, 0.168 - 0.168 * a],
                [0.272 - 0.272 * a, 0.534 - 0.534 * a, 0.131 + 0.869 * a],
            ],
            0.0,
        )
    }

    /// Saturation scale (`saturate(amount)`)
    pub fn saturate(s: f32) -> Self {
        Self::rgb(
            [
                [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
                [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
            ],
            0.0,
        )
    }

    /// Contrast around mid-grey (`contrast(amount)`)
    pub fn contrast(c: f32) -> Self {
        Self::rgb(
            [[c, 0.0, 0.0], [0.0, c, 0.0], [0.0, 0.0, c]],
            0.5 - 0.5 * c,
        )
    }

    /// Linear brightness (`brightness(amount)`)
    pub fn brightness(b: f32) -> Self {
        Self::rgb([[b, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, b]], 0.0)
    }

    /// Channel inversion, `255 - c` on 8-bit values
    pub fn invert() -> Self {
        Self::rgb(
            [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]],
            1.0,
        )
    }

    /// 3x3 colour block with a shared RGB offset; alpha passes through
    fn rgb(m: [[f32; 3]; 3], offset: f32) -> Self {
        let mut rows = Self::IDENTITY.rows;
        for (row, src) in rows.iter_mut().zip(m.iter()) {
            row[..3].copy_from_slice(src);
            row[3] = 0.0;
            row[4] = offset;
        }
        Self { rows }
    }

    /// Compose: apply `self` first, then `next`
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let mut rows = [[0.0f32; 5]; 4];
        for (i, out) in rows.iter_mut().enumerate() {
            let n = &next.rows[i];
            for j in 0..5 {
                let mut acc: f32 = (0..4).map(|k| n[k] * self.rows[k][j]).sum();
                if j == 4 {
                    acc += n[4];
                }
                out[j] = acc;
            }
        }
        ColorMatrix { rows }
    }

    /// Transform normalized channels, clamping the result to `[0, 1]`
    #[inline]
    fn apply_clamped(&self, input: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0f32; 4];
        for (channel, row) in out.iter_mut().zip(self.rows.iter()) {
            let v = row[0] * input[0]
                + row[1] * input[1]
                + row[2] * input[2]
                + row[3] * input[3]
                + row[4];
            *channel = v.clamp(0.0, 1.0);
        }
        out
    }

    /// Transform one 8-bit RGBA pixel
    #[inline]
    pub fn apply_pixel(&self, px: [u8; 4]) -> [u8; 4] {
        to_u8(self.apply_clamped(normalize(px)))
    }

    /// Transform every pixel of an image in place
    pub fn apply_in_place(&self, image: &mut RgbaImage) {
        for pixel in image.pixels_mut() {
            pixel.0 = self.apply_pixel(pixel.0);
        }
    }
}

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[inline]
fn normalize(px: [u8; 4]) -> [f32; 4] {
    px.map(|c| c as f32 / 255.0)
}

#[inline]
fn to_u8(v: [f32; 4]) -> [u8; 4] {
    v.map(|c| (c * 255.0).round() as u8)
}

/// Ordered colour matrices, clamped after each stage
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGrade {
    stages: Vec<ColorMatrix>,
}

impl ColorGrade {
    pub fn new(stages: Vec<ColorMatrix>) -> Self {
        Self { stages }
    }

    /// The fixed retro grade:
    /// `contrast(1.2) sepia(0.7) saturate(0.8) brightness(1.1)`
    pub fn retro() -> Self {
        Self::new(vec![
            ColorMatrix::contrast(retro::CONTRAST),
            ColorMatrix::sepia(retro::SEPIA),
            ColorMatrix::saturate(retro::SATURATION),
            ColorMatrix::brightness(retro::BRIGHTNESS),
        ])
    }

    pub fn stages(&self) -> &[ColorMatrix] {
        &self.stages
    }

    /// Transform one 8-bit RGBA pixel through every stage
    #[inline]
    pub fn apply_pixel(&self, px: [u8; 4]) -> [u8; 4] {
        let graded = self
            .stages
            .iter()
            .fold(normalize(px), |v, stage| stage.apply_clamped(v));
        to_u8(graded)
    }

    /// Transform every pixel of an image in place
    pub fn apply_in_place(&self, image: &mut RgbaImage) {
        for pixel in image.pixels_mut() {
            pixel.0 = self.apply_pixel(pixel.0);
        }
    }
}

impl From<ColorMatrix> for ColorGrade {
    fn from(matrix: ColorMatrix) -> Self {
        Self::new(vec![matrix])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_exact() {
        for v in 0..=255u8 {
            let px = [v, 255 - v, v / 2, 200];
            assert_eq!(ColorMatrix::IDENTITY.apply_pixel(px), px);
        }
    }

    #[test]
    fn test_invert_is_255_minus_channel() {
        let m = ColorMatrix::invert();
        assert_eq!(m.apply_pixel([0, 128, 255, 77]), [255, 127, 0, 77]);
    }

    #[test]
    fn test_grayscale_equalizes_channels() {
        let out = ColorMatrix::grayscale(1.0).apply_pixel([200, 40, 90, 255]);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
        assert_eq!(out[3], 255);
    }

    #[test]
    fn test_grayscale_keeps_white_and_black() {
        let m = ColorMatrix::grayscale(1.0);
        assert_eq!(m.apply_pixel([255, 255, 255, 255]), [255, 255, 255, 255]);
        assert_eq!(m.apply_pixel([0, 0, 0, 255]), [0, 0, 0, 255]);
    }

    #[test]
    fn test_zero_amount_filters_are_identity() {
        let px = [12, 200, 99, 255];
        assert_eq!(ColorMatrix::sepia(0.0).apply_pixel(px), px);
        assert_eq!(ColorMatrix::grayscale(0.0).apply_pixel(px), px);
        assert_eq!(ColorMatrix::saturate(1.0).apply_pixel(px), px);
        assert_eq!(ColorMatrix::contrast(1.0).apply_pixel(px), px);
    }

    #[test]
    fn test_sepia_warms_grey() {
        let out = ColorMatrix::sepia(1.0).apply_pixel([100, 100, 100, 255]);
        assert!(out[0] > out[1] && out[1] > out[2]);
    }

    #[test]
    fn test_then_matches_sequential_application_in_range() {
        let a = ColorMatrix::contrast(1.2);
        let b = ColorMatrix::brightness(0.9);
        let px = [100, 120, 140, 255];
        let sequential = b.apply_pixel(a.apply_pixel(px));
        let composed = a.then(&b).apply_pixel(px);
        for c in 0..4 {
            assert!((sequential[c] as i16 - composed[c] as i16).abs() <= 1);
        }
    }

    #[test]
    fn test_then_with_identity_is_noop() {
        let m = ColorMatrix::sepia(0.7).then(&ColorMatrix::contrast(1.2));
        assert_eq!(m.then(&ColorMatrix::IDENTITY), m);
        assert_eq!(ColorMatrix::IDENTITY.then(&m), m);
    }

    #[test]
    fn test_retro_leaves_alpha() {
        let out = ColorGrade::retro().apply_pixel([10, 20, 30, 123]);
        assert_eq!(out[3], 123);
    }

    #[test]
    fn test_retro_grade_clamps_between_stages() {
        // contrast(1.2) drives red and green below zero; the clamp keeps
        // them from dragging the sepia blue channel down
        let px = [0, 0, 165, 255];
        assert_eq!(ColorGrade::retro().apply_pixel(px), [25, 23, 65, 255]);

        let mut collapsed = ColorMatrix::IDENTITY;
        for stage in ColorGrade::retro().stages() {
            collapsed = collapsed.then(stage);
        }
        assert_eq!(collapsed.apply_pixel(px), [0, 0, 46, 255]);
    }

    #[test]
    fn test_single_stage_grade_matches_matrix() {
        let grade = ColorGrade::from(ColorMatrix::sepia(1.0));
        for v in (0..=255u8).step_by(17) {
            let px = [v, 255 - v, v / 3, 255];
            assert_eq!(grade.apply_pixel(px), ColorMatrix::sepia(1.0).apply_pixel(px));
        }
    }

    #[test]
    fn test_retro_grade_in_range_matches_collapsed_matrix() {
        let mut collapsed = ColorMatrix::IDENTITY;
        for stage in ColorGrade::retro().stages() {
            collapsed = collapsed.then(stage);
        }
        let px = [128, 128, 128, 255];
        assert_eq!(ColorGrade::retro().apply_pixel(px), collapsed.apply_pixel(px));
    }
}
