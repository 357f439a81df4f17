// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Read once at startup from `$XDG_CONFIG_HOME/retrocam/config.json` and
//! never written back. Command-line flags override individual fields.

use crate::app::{FilterType, PixelSize, PreviewState};
use crate::backends::camera::{
    CameraBackend, CameraBackendType, CameraDevice, CameraFormat, CaptureRequest, find_device,
};
use crate::constants::{app_info, capture, qr, timing};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Frame source (v4l2, file, test-pattern)
    pub backend: CameraBackendType,
    /// V4L2 device to open; the first capture device when unset
    pub device_path: Option<String>,
    /// Still image used by the file backend
    pub file_source: Option<PathBuf>,
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// Preview ticks per second
    pub refresh_rate: u32,
    /// Filter selected when the preview opens
    pub initial_filter: FilterType,
    /// Retro block size selected when the preview opens
    pub initial_pixel_size: PixelSize,
    /// String encoded in the QR panel
    pub qr_data: String,
    /// QR raster edge length in pixels
    pub qr_size: u32,
    /// UI language override (e.g. "ko"); desktop languages when unset
    pub language: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            device_path: None,
            file_source: None,
            capture_width: capture::DEFAULT_WIDTH,
            capture_height: capture::DEFAULT_HEIGHT,
            refresh_rate: timing::DEFAULT_REFRESH_RATE,
            initial_filter: FilterType::default(),
            initial_pixel_size: PixelSize::default(),
            qr_data: qr::DEFAULT_DATA.to_string(),
            qr_size: qr::DEFAULT_WIDTH,
            language: None,
        }
    }
}

/// Location of the config file, if the platform has a config directory
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(app_info::APP_NAME).join(app_info::CONFIG_FILE))
}

impl Config {
    /// Load from the default location; defaults when there is no file
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`; defaults when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;

        info!(path = %path.display(), backend = %config.backend, "Loaded configuration");
        Ok(config)
    }

    /// Reject values the preview cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(ConfigError::Invalid(format!(
                "capture resolution {}x{} has a zero dimension",
                self.capture_width, self.capture_height
            )));
        }
        if !(1..=timing::MAX_REFRESH_RATE).contains(&self.refresh_rate) {
            return Err(ConfigError::Invalid(format!(
                "refresh_rate {} outside 1..={}",
                self.refresh_rate,
                timing::MAX_REFRESH_RATE
            )));
        }
        if self.qr_size == 0 {
            return Err(ConfigError::Invalid("qr_size must be positive".to_string()));
        }
        if self.qr_data.is_empty() {
            return Err(ConfigError::Invalid("qr_data must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn capture_format(&self) -> CameraFormat {
        CameraFormat {
            width: self.capture_width,
            height: self.capture_height,
        }
    }

    /// What to ask `backend` for
    ///
    /// A configured device path that the backend does not enumerate is still
    /// passed through, so the open itself reports why it is unusable.
    pub fn capture_request(&self, backend: &dyn CameraBackend) -> CaptureRequest {
        let device = self.device_path.as_deref().map(|path| {
            find_device(backend, path).unwrap_or_else(|| CameraDevice {
                name: path.to_string(),
                path: path.to_string(),
                driver: None,
            })
        });

        CaptureRequest {
            device,
            format: self.capture_format(),
        }
    }

    /// Preview state the UI starts in
    pub fn preview_state(&self) -> PreviewState {
        PreviewState::new(self.initial_filter, self.initial_pixel_size)
    }

    /// Refresh rate limited to the accepted range
    pub fn refresh_rate(&self) -> u32 {
        self.refresh_rate.clamp(1, timing::MAX_REFRESH_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::VirtualCameraBackend;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("retrocam-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("retrocam-does-not-exist/config.json");
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_file(
            "partial.json",
            r#"{ "initial_filter": "retro", "initial_pixel_size": 12 }"#,
        );
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.initial_filter, FilterType::Retro);
        assert_eq!(config.initial_pixel_size.get(), 12);
        assert_eq!(config.refresh_rate, timing::DEFAULT_REFRESH_RATE);
        assert_eq!(config.backend, CameraBackendType::V4l2);
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let path = temp_file("broken.json", "{ not json");
        match Config::load_from(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_pixel_size_rejected() {
        let path = temp_file("pixel.json", r#"{ "initial_pixel_size": 2 }"#);
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.refresh_rate = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config = Config {
            qr_data: String::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capture_request_passes_unknown_device_through() {
        let config = Config {
            device_path: Some("/dev/video42".to_string()),
            ..Config::default()
        };
        let request = config.capture_request(&VirtualCameraBackend::test_pattern());
        assert_eq!(request.device.unwrap().path, "/dev/video42");
        assert_eq!(request.format, CameraFormat::default());
    }
}
