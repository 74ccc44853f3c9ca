//! The per-frame adapter seam shared by both viewer modes.
//!
//! An [`Annotator`] is initialized once with fixed options and invoked once
//! per changed frame. The two implementations correspond to the two viewer
//! modes: bounding boxes, or dense landmark sets.

use crate::detector::{DetectorError, DetectorOptions, FaceDetector};
use crate::landmarker::{FaceLandmarker, LandmarkerError, LandmarkerOptions};
use crate::types::FrameAnnotations;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmarker error: {0}")]
    Landmarker(#[from] LandmarkerError),
}

/// Per-frame inference adapter: RGB24 frame in, annotations out.
pub trait Annotator {
    fn name(&self) -> &'static str;
    fn annotate(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<FrameAnnotations, AnnotateError>;
}

/// Face detection mode: bounding boxes with confidence scores.
pub struct DetectionAnnotator {
    detector: FaceDetector,
}

impl DetectionAnnotator {
    pub fn new(options: &DetectorOptions) -> Result<Self, AnnotateError> {
        Ok(Self {
            detector: FaceDetector::load(options)?,
        })
    }
}

impl Annotator for DetectionAnnotator {
    fn name(&self) -> &'static str {
        "face-detection"
    }

    fn annotate(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<FrameAnnotations, AnnotateError> {
        let detections = self.detector.detect(rgb, width, height)?;
        Ok(FrameAnnotations::Detections(detections))
    }
}

/// Face landmark mode: detection feeds ROIs to the mesh model.
pub struct LandmarkAnnotator {
    detector: FaceDetector,
    landmarker: FaceLandmarker,
}

impl LandmarkAnnotator {
    pub fn new(
        detector_options: &DetectorOptions,
        landmarker_options: &LandmarkerOptions,
    ) -> Result<Self, AnnotateError> {
        Ok(Self {
            detector: FaceDetector::load(detector_options)?,
            landmarker: FaceLandmarker::load(landmarker_options)?,
        })
    }
}

impl Annotator for LandmarkAnnotator {
    fn name(&self) -> &'static str {
        "face-landmark"
    }

    fn annotate(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<FrameAnnotations, AnnotateError> {
        let faces = self.detector.detect(rgb, width, height)?;
        let sets = self.landmarker.landmarks(rgb, width, height, &faces)?;
        Ok(FrameAnnotations::LandmarkSets(sets))
    }
}
