// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use retrocam::backends::camera::CameraBackendType;
use retrocam::{Config, FilterType};

#[test]
fn test_config_default() {
    // Test that default config can be created
    let config = Config::default();

    // Check sensible defaults
    assert_eq!(config.backend, CameraBackendType::V4l2);
    assert_eq!(
        config.initial_filter,
        FilterType::None,
        "Preview should start unfiltered"
    );
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_qr_data() {
    // Test that the QR panel has something to encode
    let config = Config::default();
    assert!(!config.qr_data.is_empty(), "QR data should not be empty");
    assert!(config.qr_size > 0);
}

#[test]
fn test_config_json_uses_kebab_case_backend() {
    let config: Config = serde_json::from_str(r#"{ "backend": "test-pattern" }"#).unwrap();
    assert_eq!(config.backend, CameraBackendType::TestPattern);
}

#[test]
fn test_preview_state_from_config() {
    let config: Config =
        serde_json::from_str(r#"{ "initial_filter": "sepia", "initial_pixel_size": 5 }"#).unwrap();
    let state = config.preview_state();
    assert_eq!(state.filter, FilterType::Sepia);
    assert_eq!(state.pixel_size.get(), 5);
}
