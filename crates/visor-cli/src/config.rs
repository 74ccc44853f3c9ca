//! Viewer configuration: optional `visor.toml` file, overridden by
//! `VISOR_*` environment variables, with working defaults for both.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use visor_render::{parse_hex, OverlayStyle};

const DEFAULT_CONFIG_PATH: &str = "visor.toml";
const DETECTOR_MODEL_FILE: &str = "blaze_face_short_range.onnx";
const LANDMARK_MODEL_FILE: &str = "face_landmarker.onnx";

/// Resolved viewer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture resolution; the driver may negotiate differently.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Directory where recordings and snapshots are written.
    pub output_dir: PathBuf,
    /// Nominal frame rate written into saved recordings.
    pub record_fps: u32,
    /// JPEG quality for recorded segments.
    pub jpeg_quality: u8,
    pub style: OverlayStyle,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    camera: CameraTable,
    capture: CaptureTable,
    style: StyleTable,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CameraTable {
    device: String,
    width: u32,
    height: u32,
}

impl Default for CameraTable {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CaptureTable {
    fps: u32,
    jpeg_quality: u8,
}

impl Default for CaptureTable {
    fn default() -> Self {
        Self {
            fps: visor_capture::recorder::DEFAULT_FPS,
            jpeg_quality: visor_capture::recorder::DEFAULT_JPEG_QUALITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StyleTable {
    box_color: Option<String>,
    label_color: Option<String>,
    landmark_color: Option<String>,
    snapshot_landmark_color: Option<String>,
}

impl Config {
    /// Load configuration: `visor.toml` (or `VISOR_CONFIG`) if present,
    /// then `VISOR_*` environment overrides.
    pub fn load() -> Self {
        let path = std::env::var("VISOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let file = if Path::new(&path).exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str::<FileConfig>(&content) {
                    Ok(parsed) => {
                        tracing::info!(path, "loaded configuration file");
                        parsed
                    }
                    Err(e) => {
                        tracing::warn!(path, error = %e, "bad configuration file, using defaults");
                        FileConfig::default()
                    }
                },
                Err(e) => {
                    tracing::warn!(path, error = %e, "cannot read configuration file, using defaults");
                    FileConfig::default()
                }
            }
        } else {
            FileConfig::default()
        };

        let mut config = Self::from_file(file);

        if let Ok(device) = std::env::var("VISOR_CAMERA_DEVICE") {
            config.camera_device = device;
        }
        if let Ok(dir) = std::env::var("VISOR_MODEL_DIR") {
            config.model_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("VISOR_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    fn from_file(file: FileConfig) -> Self {
        let defaults = OverlayStyle::default();
        let hex = |value: &Option<String>, fallback: [u8; 3]| {
            value.as_deref().map(|s| parse_hex(s, fallback)).unwrap_or(fallback)
        };

        let style = OverlayStyle {
            box_color: hex(&file.style.box_color, defaults.box_color),
            label_color: hex(&file.style.label_color, defaults.label_color),
            landmark_color: hex(&file.style.landmark_color, defaults.landmark_color),
            snapshot_landmark_color: hex(
                &file.style.snapshot_landmark_color,
                defaults.snapshot_landmark_color,
            ),
            ..defaults
        };

        Self {
            camera_device: file.camera.device,
            camera_width: file.camera.width,
            camera_height: file.camera.height,
            model_dir: visor_core::default_model_dir(),
            output_dir: PathBuf::from("."),
            record_fps: file.capture.fps.max(1),
            jpeg_quality: file.capture.jpeg_quality.clamp(1, 100),
            style,
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(DETECTOR_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face landmark model.
    pub fn landmark_model_path(&self) -> String {
        self.model_dir
            .join(LANDMARK_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_file(FileConfig::default());
        assert_eq!(config.camera_device, "/dev/video0");
        assert_eq!((config.camera_width, config.camera_height), (640, 480));
        assert_eq!(config.record_fps, 30);
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.style.box_color, [0xFF, 0x8C, 0x42]);
    }

    #[test]
    fn test_file_overrides() {
        let file: FileConfig = toml::from_str(
            r#"
            [camera]
            device = "/dev/video2"
            width = 1280
            height = 720

            [capture]
            fps = 15

            [style]
            box_color = "#00FF00"
            "#,
        )
        .unwrap();

        let config = Config::from_file(file);
        assert_eq!(config.camera_device, "/dev/video2");
        assert_eq!((config.camera_width, config.camera_height), (1280, 720));
        assert_eq!(config.record_fps, 15);
        // Unset capture key keeps its default
        assert_eq!(config.jpeg_quality, 90);
        assert_eq!(config.style.box_color, [0x00, 0xFF, 0x00]);
        // Unset style keys keep the default palette
        assert_eq!(config.style.label_color, [0xFF, 0x3C, 0xAC]);
    }

    #[test]
    fn test_bad_style_hex_falls_back() {
        let file: FileConfig = toml::from_str(
            r#"
            [style]
            label_color = "magenta"
            "#,
        )
        .unwrap();
        let config = Config::from_file(file);
        assert_eq!(config.style.label_color, [0xFF, 0x3C, 0xAC]);
    }

    #[test]
    fn test_model_paths() {
        let mut config = Config::from_file(FileConfig::default());
        config.model_dir = PathBuf::from("/opt/models");
        assert_eq!(
            config.detector_model_path(),
            "/opt/models/blaze_face_short_range.onnx"
        );
        assert_eq!(config.landmark_model_path(), "/opt/models/face_landmarker.onnx");
    }

    #[test]
    fn test_zero_fps_clamped() {
        let file: FileConfig = toml::from_str("[capture]\nfps = 0\n").unwrap();
        assert_eq!(Config::from_file(file).record_fps, 1);
    }
}
