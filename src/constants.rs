// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Retro (mosaic + posterize) filter parameters
pub mod retro {
    /// Smallest accepted mosaic block size in pixels
    pub const MIN_PIXEL_SIZE: u8 = 4;

    /// Largest accepted mosaic block size in pixels
    pub const MAX_PIXEL_SIZE: u8 = 16;

    /// Block size used until the user moves the slider
    pub const DEFAULT_PIXEL_SIZE: u8 = 8;

    /// Width of one posterize bucket; 256 / 64 = 4 levels per channel
    pub const POSTERIZE_STEP: u8 = 64;

    /// Contrast applied by the retro grade
    pub const CONTRAST: f32 = 1.2;

    /// Sepia amount applied by the retro grade
    pub const SEPIA: f32 = 0.7;

    /// Saturation applied by the retro grade
    pub const SATURATION: f32 = 0.8;

    /// Brightness applied by the retro grade
    pub const BRIGHTNESS: f32 = 1.1;
}

/// QR panel parameters
pub mod qr {
    /// Default raster width in pixels
    pub const DEFAULT_WIDTH: u32 = 128;

    /// Default raster height in pixels
    pub const DEFAULT_HEIGHT: u32 = 128;

    /// Light modules around the symbol, per the QR standard
    pub const QUIET_ZONE_MODULES: usize = 4;

    /// Encoded when neither the config nor the CLI supplies a string
    pub const DEFAULT_DATA: &str = "https://example.com/";
}

/// Render loop timing
pub mod timing {
    use super::Duration;

    /// Refresh rate used when the config does not set one
    pub const DEFAULT_REFRESH_RATE: u32 = 60;

    /// Highest refresh rate accepted from configuration
    pub const MAX_REFRESH_RATE: u32 = 240;

    /// Log rendered/deferred counters every this many ticks
    pub const TICK_LOG_INTERVAL: u64 = 300;

    /// How long `snapshot` waits for the first frame
    pub const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

    /// Poll interval while waiting for the first frame
    pub const FIRST_FRAME_POLL: Duration = Duration::from_millis(10);

    /// Shortest tick interval a render loop accepts
    pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

    /// Convert a refresh rate into the interval between ticks
    pub fn frame_interval(refresh_rate: u32) -> Duration {
        let rate = refresh_rate.clamp(1, MAX_REFRESH_RATE);
        Duration::from_secs_f64(1.0 / rate as f64)
    }
}

/// Capture pipeline parameters
pub mod capture {
    use super::Duration;

    /// Capacity of the frame channel between capture thread and renderer
    pub const FRAME_CHANNEL_CAPACITY: usize = 4;

    /// Memory-mapped buffers requested from V4L2
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Resolution requested when the config does not set one
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Resolution requested when the config does not set one
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Frame rate of the file and test-pattern sources
    pub const VIRTUAL_FRAME_DURATION: Duration = Duration::from_millis(33);

    /// Back-off after a failed dequeue before retrying
    pub const RETRY_DELAY: Duration = Duration::from_millis(10);

    /// Longest a dequeue may block; a device silent this long is gone
    pub const DEQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

    /// Consecutive failed dequeues before the stream is given up
    pub const MAX_DEQUEUE_FAILURES: u32 = 100;

    /// Log a capture summary every this many frames
    pub const FRAME_LOG_INTERVAL: u64 = 300;
}

/// Supported still-image extensions for the file source and snapshots
pub mod file_formats {
    /// Extensions the `image` crate decodes for the file source
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if an extension (lowercase, no dot) is a supported image
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext)
    }
}

/// Application identity
pub mod app_info {
    /// Binary and config directory name
    pub const APP_NAME: &str = "retrocam";

    /// Config file name inside the config directory
    pub const CONFIG_FILE: &str = "config.json";

    /// Subdirectory of the user's pictures folder for snapshots
    pub const SNAPSHOT_DIR: &str = "retrocam";

    /// Version string embedded by the build script
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_clamps_rate() {
        assert_eq!(timing::frame_interval(0), Duration::from_secs(1));
        assert_eq!(
            timing::frame_interval(10_000),
            timing::frame_interval(timing::MAX_REFRESH_RATE)
        );
    }

    #[test]
    fn test_posterize_step_gives_four_levels() {
        assert_eq!(256 / retro::POSTERIZE_STEP as u32, 4);
    }
}
