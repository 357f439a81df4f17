// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion from raw capture buffers to RGBA
//!
//! Capture devices hand us packed YUV, compressed MJPEG, RGB24 or 8-bit
//! grey. Everything downstream works on tightly packed RGBA8.

use image::ImageFormat;

/// Source pixel formats the V4L2 backend knows how to convert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Packed YUV 4:2:2, Y0 U Y1 V
    Yuyv,
    /// Motion JPEG, one JPEG image per buffer
    Mjpeg,
    /// Packed 8-bit RGB
    Rgb24,
    /// 8-bit luminance
    Grey,
}

impl SourceFormat {
    /// Preference order when negotiating with a device
    pub const PREFERRED: [SourceFormat; 4] = [
        SourceFormat::Yuyv,
        SourceFormat::Mjpeg,
        SourceFormat::Rgb24,
        SourceFormat::Grey,
    ];

    /// V4L2 FourCC code
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            SourceFormat::Yuyv => *b"YUYV",
            SourceFormat::Mjpeg => *b"MJPG",
            SourceFormat::Rgb24 => *b"RGB3",
            SourceFormat::Grey => *b"GREY",
        }
    }

    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        Self::PREFERRED.into_iter().find(|f| &f.fourcc() == code)
    }

    /// Convert one raw buffer of this format to RGBA
    pub fn to_rgba(&self, data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, String> {
        match self {
            SourceFormat::Yuyv => Ok(yuyv_to_rgba(data, width, height)),
            SourceFormat::Mjpeg => mjpeg_to_rgba(data, width, height),
            SourceFormat::Rgb24 => Ok(rgb24_to_rgba(data, width, height)),
            SourceFormat::Grey => Ok(grey_to_rgba(data, width, height)),
        }
    }
}

/// BT.601 YUV to RGB
#[inline]
fn yuv_to_rgb(y: f32, u: f32, v: f32) -> [u8; 3] {
    [
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
    ]
}

/// Convert YUYV (YUV 4:2:2) to RGBA
///
/// Each 4-byte group Y0 U Y1 V encodes 2 pixels. Missing trailing pixels
/// (short buffers) are filled with opaque black.
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgba = Vec::with_capacity(pixel_count * 4);

    'outer: for chunk in data.chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            if rgba.len() >= pixel_count * 4 {
                break 'outer;
            }
            let [r, g, b] = yuv_to_rgb(y, u, v);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }

    pad_to(rgba, pixel_count)
}

/// Expand packed RGB24 to RGBA
pub fn rgb24_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let rgba: Vec<u8> = data
        .chunks_exact(3)
        .take(pixel_count)
        .flat_map(|px| [px[0], px[1], px[2], 255])
        .collect();
    pad_to(rgba, pixel_count)
}

/// Expand 8-bit grey to RGBA
pub fn grey_to_rgba(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let rgba: Vec<u8> = data
        .iter()
        .take(pixel_count)
        .flat_map(|&v| [v, v, v, 255])
        .collect();
    pad_to(rgba, pixel_count)
}

/// Decode one MJPEG buffer to RGBA, checking its size against the format
pub fn mjpeg_to_rgba(data: &[u8], width: u32, height: u32) -> Result<Vec<u8>, String> {
    let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| format!("MJPEG decode failed: {}", e))?
        .to_rgba8();

    if decoded.dimensions() != (width, height) {
        return Err(format!(
            "MJPEG frame is {}x{}, expected {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        ));
    }
    Ok(decoded.into_raw())
}

fn pad_to(mut rgba: Vec<u8>, pixel_count: usize) -> Vec<u8> {
    while rgba.len() < pixel_count * 4 {
        rgba.extend_from_slice(&[0, 0, 0, 255]);
    }
    rgba
}
