// SPDX-License-Identifier: GPL-3.0-only

//! Preview selection state

use crate::constants::retro::{DEFAULT_PIXEL_SIZE, MAX_PIXEL_SIZE, MIN_PIXEL_SIZE};
use crate::fl;
use crate::media::{ColorGrade, ColorMatrix};
use serde::{Deserialize, Serialize};

/// Visual filter applied to the preview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Frame shown as captured
    #[default]
    None,
    /// Luminance grayscale
    Grayscale,
    /// Sepia tone
    Sepia,
    /// Mosaic + colour grade + posterize
    Retro,
    /// Inverted colours
    Invert,
}

impl FilterType {
    /// Filters in the order the picker shows them
    pub const ALL: [FilterType; 5] = [
        FilterType::None,
        FilterType::Grayscale,
        FilterType::Sepia,
        FilterType::Invert,
        FilterType::Retro,
    ];

    /// Localized label
    pub fn label(&self) -> String {
        match self {
            FilterType::None => fl!("filter-none"),
            FilterType::Grayscale => fl!("filter-grayscale"),
            FilterType::Sepia => fl!("filter-sepia"),
            FilterType::Invert => fl!("filter-invert"),
            FilterType::Retro => fl!("filter-retro"),
        }
    }

    /// Stable identifier used in config files and on the command line
    pub fn id(&self) -> &'static str {
        match self {
            FilterType::None => "none",
            FilterType::Grayscale => "grayscale",
            FilterType::Sepia => "sepia",
            FilterType::Invert => "invert",
            FilterType::Retro => "retro",
        }
    }

    /// Per-pixel colour grade, `None` for the identity filter.
    ///
    /// For [`FilterType::Retro`] this is the grade applied during the
    /// downscale stage.
    pub fn color_grade(&self) -> Option<ColorGrade> {
        match self {
            FilterType::None => None,
            FilterType::Grayscale => Some(ColorMatrix::grayscale(1.0).into()),
            FilterType::Sepia => Some(ColorMatrix::sepia(1.0).into()),
            FilterType::Invert => Some(ColorMatrix::invert().into()),
            FilterType::Retro => Some(ColorGrade::retro()),
        }
    }

    /// Position in [`FilterType::ALL`]
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).unwrap_or(0)
    }

    /// Next filter in picker order, wrapping around
    pub fn next(&self) -> FilterType {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous filter in picker order, wrapping around
    pub fn previous(&self) -> FilterType {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for FilterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(|f| f.id()).collect();
                format!("unknown filter '{}' (expected one of {})", s, known.join(", "))
            })
    }
}

/// Mosaic block size for the retro filter, always within `[4, 16]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PixelSize(u8);

impl PixelSize {
    pub const MIN: PixelSize = PixelSize(MIN_PIXEL_SIZE);
    pub const MAX: PixelSize = PixelSize(MAX_PIXEL_SIZE);

    /// `None` when `value` is out of range
    pub fn new(value: u8) -> Option<Self> {
        (MIN_PIXEL_SIZE..=MAX_PIXEL_SIZE)
            .contains(&value)
            .then_some(Self(value))
    }

    /// Nearest valid size
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(MIN_PIXEL_SIZE as i64, MAX_PIXEL_SIZE as i64) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// One step larger, saturating at the maximum
    pub fn increment(&self) -> Self {
        Self::clamped(self.0 as i64 + 1)
    }

    /// One step smaller, saturating at the minimum
    pub fn decrement(&self) -> Self {
        Self::clamped(self.0 as i64 - 1)
    }

    /// Position of this size within the slider range, in `[0, 1]`
    pub fn fraction(&self) -> f32 {
        (self.0 - MIN_PIXEL_SIZE) as f32 / (MAX_PIXEL_SIZE - MIN_PIXEL_SIZE) as f32
    }
}

impl Default for PixelSize {
    fn default() -> Self {
        Self(DEFAULT_PIXEL_SIZE)
    }
}

impl TryFrom<u8> for PixelSize {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "pixel size {} outside {}..={}",
                value, MIN_PIXEL_SIZE, MAX_PIXEL_SIZE
            )
        })
    }
}

impl From<PixelSize> for u8 {
    fn from(size: PixelSize) -> u8 {
        size.0
    }
}

impl std::fmt::Display for PixelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-controlled preview state, read by the renderer once per tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreviewState {
    pub filter: FilterType,
    pub pixel_size: PixelSize,
}

impl PreviewState {
    pub fn new(filter: FilterType, pixel_size: PixelSize) -> Self {
        Self { filter, pixel_size }
    }

    pub fn select_filter(&mut self, filter: FilterType) {
        self.filter = filter;
    }

    /// The slider only exists while the retro filter is selected
    pub fn pixel_size_adjustable(&self) -> bool {
        self.filter == FilterType::Retro
    }

    /// Grow the mosaic blocks; ignored unless retro is selected
    pub fn increase_pixel_size(&mut self) {
        if self.pixel_size_adjustable() {
            self.pixel_size = self.pixel_size.increment();
        }
    }

    /// Shrink the mosaic blocks; ignored unless retro is selected
    pub fn decrease_pixel_size(&mut self) {
        if self.pixel_size_adjustable() {
            self.pixel_size = self.pixel_size.decrement();
        }
    }
}
