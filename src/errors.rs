// SPDX-License-Identifier: MPL-2.0

//! Error types for the camera preview

use std::fmt;
use std::path::PathBuf;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera acquisition errors
    Camera(CameraError),
    /// QR encoding errors
    Qr(QrError),
    /// Configuration errors
    Config(ConfigError),
    /// Image decode/encode errors
    Storage(String),
    /// Filesystem or terminal I/O errors
    Io(String),
    /// Generic error with message
    Other(String),
}

/// Camera acquisition errors
///
/// `PermissionDenied` and `DeviceUnavailable` are the two outcomes the
/// preview reports to the user; the rest are backend-level failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Access to the capture device was refused
    PermissionDenied(String),
    /// No capture device exists, or it is busy
    DeviceUnavailable(String),
    /// Device opened but streaming could not start
    InitializationFailed(String),
    /// Device offered no format we can convert to RGBA
    InvalidFormat(String),
    /// Device went away while streaming
    Disconnected,
}

impl CameraError {
    /// Whether this is an access problem the user has to resolve
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied(_) | CameraError::DeviceUnavailable(_)
        )
    }
}

/// QR encoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrError {
    /// Payload does not fit in the largest QR version
    DataTooLong(usize),
    /// Any other encoder failure
    Encoding(String),
}

/// Configuration errors
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Config file exists but could not be read
    Read { path: PathBuf, reason: String },
    /// Config file is not valid JSON for `Config`
    Parse { path: PathBuf, reason: String },
    /// A value is outside its accepted range
    Invalid(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Qr(e) => write!(f, "QR error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CameraError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
        }
    }
}

impl fmt::Display for QrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrError::DataTooLong(len) => {
                write!(f, "Payload of {} bytes is too long for a QR code", len)
            }
            QrError::Encoding(msg) => write!(f, "Encoding failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, reason } => {
                write!(f, "Failed to read {}: {}", path.display(), reason)
            }
            ConfigError::Parse { path, reason } => {
                write!(f, "Failed to parse {}: {}", path.display(), reason)
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for QrError {}
impl std::error::Error for ConfigError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<QrError> for AppError {
    fn from(err: QrError) -> Self {
        AppError::Qr(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Classify an I/O error from opening a capture device
pub fn camera_error_from_io(path: &str, err: &std::io::Error) -> CameraError {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::PermissionDenied => {
            CameraError::PermissionDenied(format!("{}: {}", path, err))
        }
        ErrorKind::NotFound => CameraError::DeviceUnavailable(format!("{}: {}", path, err)),
        _ => match err.raw_os_error() {
            Some(libc::EPERM) => CameraError::PermissionDenied(format!("{}: {}", path, err)),
            Some(libc::ENXIO | libc::ENODEV | libc::EBUSY) => {
                CameraError::DeviceUnavailable(format!("{}: {}", path, err))
            }
            _ => CameraError::InitializationFailed(format!("{}: {}", path, err)),
        },
    }
}

/// Whether an I/O error on an open device means the device is gone
pub fn is_disconnect(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
        || matches!(
            err.raw_os_error(),
            Some(libc::ENODEV | libc::ENXIO | libc::EIO)
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_permission_maps_to_denied() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        let camera = camera_error_from_io("/dev/video0", &err);
        assert!(matches!(camera, CameraError::PermissionDenied(_)));
        assert!(camera.is_access_denied());
    }

    #[test]
    fn test_missing_device_maps_to_unavailable() {
        let err = io::Error::from(io::ErrorKind::NotFound);
        let camera = camera_error_from_io("/dev/video9", &err);
        assert!(matches!(camera, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_busy_device_maps_to_unavailable() {
        let err = io::Error::from_raw_os_error(libc::EBUSY);
        let camera = camera_error_from_io("/dev/video0", &err);
        assert!(matches!(camera, CameraError::DeviceUnavailable(_)));
    }

    #[test]
    fn test_eperm_maps_to_denied() {
        let err = io::Error::from_raw_os_error(libc::EPERM);
        let camera = camera_error_from_io("/dev/video0", &err);
        assert!(matches!(camera, CameraError::PermissionDenied(_)));
    }

    #[test]
    fn test_unknown_errno_is_initialization_failure() {
        let err = io::Error::from_raw_os_error(libc::EINVAL);
        let camera = camera_error_from_io("/dev/video0", &err);
        assert!(matches!(camera, CameraError::InitializationFailed(_)));
        assert!(!camera.is_access_denied());
    }

    #[test]
    fn test_disconnect_errors() {
        for errno in [libc::ENODEV, libc::ENXIO, libc::EIO] {
            assert!(is_disconnect(&io::Error::from_raw_os_error(errno)), "errno {}", errno);
        }
        assert!(!is_disconnect(&io::Error::from_raw_os_error(libc::EINTR)));
        assert!(!is_disconnect(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn test_io_and_messages_fold_into_app_error() {
        let err: AppError = io::Error::from(io::ErrorKind::NotFound).into();
        assert!(matches!(err, AppError::Io(_)));
        let err: AppError = "No frame arrived from the camera".into();
        assert_eq!(err.to_string(), "No frame arrived from the camera");
    }

    #[test]
    fn test_app_error_display_wraps_camera() {
        let err: AppError = CameraError::Disconnected.into();
        assert_eq!(err.to_string(), "Camera error: Camera disconnected");
    }
}
