use serde::{Deserialize, Serialize};

/// Axis-aligned box in normalized frame coordinates, `[0,1]` on both axes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One detected face: normalized bounding box, confidence score, and the
/// detector's six coarse keypoints (eyes, ears, nose tip, mouth center),
/// also normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: NormalizedBox,
    pub score: f32,
    pub keypoints: Option<[(f32, f32); 6]>,
}

/// One normalized landmark point. `z` is depth in crop-relative units and
/// is not used by the overlay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Dense landmark set for one face, with the model's presence score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub points: Vec<LandmarkPoint>,
    pub presence: f32,
}

/// Per-frame annotation result, paired with the frame it was computed from
/// and discarded after drawing.
#[derive(Debug, Clone)]
pub enum FrameAnnotations {
    /// No result for this tick (startup, or the adapter failed).
    None,
    Detections(Vec<Detection>),
    LandmarkSets(Vec<LandmarkSet>),
}

impl FrameAnnotations {
    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            FrameAnnotations::None => true,
            FrameAnnotations::Detections(d) => d.is_empty(),
            FrameAnnotations::LandmarkSets(s) => s.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotations_empty() {
        assert!(FrameAnnotations::None.is_empty());
        assert!(FrameAnnotations::Detections(vec![]).is_empty());
        assert!(FrameAnnotations::LandmarkSets(vec![]).is_empty());
    }

    #[test]
    fn test_annotations_non_empty() {
        let det = Detection {
            bbox: NormalizedBox { x: 0.1, y: 0.1, width: 0.5, height: 0.5 },
            score: 0.9,
            keypoints: None,
        };
        assert!(!FrameAnnotations::Detections(vec![det]).is_empty());
    }
}
