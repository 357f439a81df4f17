// SPDX-License-Identifier: GPL-3.0-only

//! Retro mosaic: nearest-neighbour downscale with a colour grade,
//! nearest-neighbour upscale back to full size, then posterize.

use super::color_matrix::ColorGrade;
use crate::constants::retro::POSTERIZE_STEP;
use image::RgbaImage;

/// Size of the intermediate buffer for a `width x height` frame.
///
/// Never zero in either dimension, even when `pixel_size` exceeds the frame.
pub fn intermediate_dimensions(width: u32, height: u32, pixel_size: u32) -> (u32, u32) {
    let p = pixel_size.max(1);
    ((width / p).max(1), (height / p).max(1))
}

/// Quantize one channel to 4 levels: `floor(v / 64) * 64`
#[inline]
pub fn posterize_channel(v: u8) -> u8 {
    (v / POSTERIZE_STEP) * POSTERIZE_STEP
}

/// Posterize R, G and B in place; alpha is untouched
pub fn posterize(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        pixel.0[0] = posterize_channel(pixel.0[0]);
        pixel.0[1] = posterize_channel(pixel.0[1]);
        pixel.0[2] = posterize_channel(pixel.0[2]);
    }
}

/// Map a destination coordinate to the nearest source coordinate
/// by sampling at the destination pixel centre.
#[inline]
fn nearest(dst: u32, dst_len: u32, src_len: u32) -> u32 {
    let src = ((2 * dst as u64 + 1) * src_len as u64) / (2 * dst_len as u64);
    (src as u32).min(src_len - 1)
}

/// Resize `src` into `dst` (whose dimensions are the target) without
/// interpolation.
pub fn resample_nearest(src: &RgbaImage, dst: &mut RgbaImage) {
    let (sw, sh) = src.dimensions();
    let (dw, dh) = dst.dimensions();
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    let columns: Vec<u32> = (0..dw).map(|x| nearest(x, dw, sw)).collect();
    for y in 0..dh {
        let sy = nearest(y, dh, sh);
        for (x, &sx) in columns.iter().enumerate() {
            dst.put_pixel(x as u32, y, *src.get_pixel(sx, sy));
        }
    }
}

/// Reuse `buffer` when it already has the right size, reallocate otherwise
pub fn ensure_dimensions(buffer: &mut RgbaImage, width: u32, height: u32) {
    if buffer.dimensions() != (width, height) {
        *buffer = RgbaImage::new(width, height);
    }
}

/// Run the full retro pipeline from `src` into `out`.
///
/// `small` is the reusable intermediate buffer. The colour grade is applied
/// at the reduced size, before the mosaic and posterize stages.
pub fn render_retro(
    src: &RgbaImage,
    pixel_size: u32,
    grade: &ColorGrade,
    small: &mut RgbaImage,
    out: &mut RgbaImage,
) {
    let (width, height) = src.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let (sw, sh) = intermediate_dimensions(width, height, pixel_size);
    ensure_dimensions(small, sw, sh);
    resample_nearest(src, small);
    grade.apply_in_place(small);

    ensure_dimensions(out, width, height);
    resample_nearest(small, out);
    posterize(out);
}
