//! visor-core — Face detection and face landmark extraction.
//!
//! Wraps pretrained short-range face detection and face-mesh landmark
//! models, both running via ONNX Runtime for CPU inference. The models
//! themselves are external assets; this crate owns only the tensor
//! pre/post-processing around them.

pub mod annotator;
pub mod detector;
pub mod landmarker;
pub mod types;

pub use annotator::{AnnotateError, Annotator, DetectionAnnotator, LandmarkAnnotator};
pub use detector::{DetectorOptions, FaceDetector};
pub use landmarker::{FaceLandmarker, LandmarkerOptions};
pub use types::{Detection, FrameAnnotations, LandmarkPoint, LandmarkSet, NormalizedBox};

use std::path::PathBuf;

/// Default directory for ONNX model assets: `$XDG_DATA_HOME/visor/models`,
/// falling back to `~/.local/share/visor/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("visor/models")
}
