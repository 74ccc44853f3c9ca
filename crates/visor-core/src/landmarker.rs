//! Face-mesh landmark extractor via ONNX Runtime.
//!
//! Runs the dense face-mesh model over a square region of interest around
//! each detected face and maps the 468 returned points back into
//! frame-normalized coordinates.

use crate::types::{Detection, LandmarkPoint, LandmarkSet};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (different from the detector!) ---
const MESH_INPUT_SIZE: usize = 192;
const MESH_NUM_POINTS: usize = 468;
const MESH_COORDS: usize = MESH_NUM_POINTS * 3;
/// ROI side relative to the longer detection box side.
const MESH_ROI_EXPANSION: f32 = 1.5;

const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_FACES: usize = 1;
const DEFAULT_INTRA_THREADS: usize = 2;

#[derive(Error, Debug)]
pub enum LandmarkerError {
    #[error("model file not found: {0} — place the face landmark ONNX export in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("no landmark tensor among model outputs (expected {MESH_COORDS} values)")]
    NoLandmarkOutput,
    #[error("frame buffer too short: expected {expected}, got {actual}")]
    BadFrame { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Fixed initialization options. Set once when a session starts.
#[derive(Debug, Clone)]
pub struct LandmarkerOptions {
    pub model_path: String,
    /// Minimum face-presence score for a landmark set to be kept.
    pub presence_threshold: f32,
    /// Upper bound on landmark sets per frame.
    pub max_faces: usize,
    pub intra_threads: usize,
}

impl LandmarkerOptions {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            max_faces: DEFAULT_MAX_FACES,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

/// Region of interest in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoiRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// Face-mesh landmark extractor.
pub struct FaceLandmarker {
    session: Session,
    num_outputs: usize,
    presence_threshold: f32,
    max_faces: usize,
}

impl FaceLandmarker {
    /// Load the face-mesh ONNX model.
    pub fn load(options: &LandmarkerOptions) -> Result<Self, LandmarkerError> {
        if !Path::new(&options.model_path).exists() {
            return Err(LandmarkerError::ModelNotFound(options.model_path.clone()));
        }

        let session = Session::builder()?
            .with_intra_threads(options.intra_threads)
            .map_err(<ort::Error>::from)?
            .commit_from_file(&options.model_path)?;

        tracing::info!(
            path = %options.model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face landmark model"
        );

        let num_outputs = session.outputs().len();

        Ok(Self {
            session,
            num_outputs,
            presence_threshold: options.presence_threshold,
            max_faces: options.max_faces,
        })
    }

    /// Extract landmark sets for the given detections, highest-confidence
    /// faces first, capped at `max_faces`.
    pub fn landmarks(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
        faces: &[Detection],
    ) -> Result<Vec<LandmarkSet>, LandmarkerError> {
        let expected = (width * height * 3) as usize;
        if rgb.len() < expected {
            return Err(LandmarkerError::BadFrame {
                expected,
                actual: rgb.len(),
            });
        }

        let mut sets = Vec::new();
        for face in faces.iter().take(self.max_faces) {
            let roi = expand_roi(face, width as f32, height as f32);
            let crop = crop_resize_rgb(rgb, width as usize, height as usize, &roi);
            let input = preprocess(&crop);

            let outputs =
                self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

            // Outputs are discovered by element count: exports of this model
            // family vary in tensor order and naming, but the landmark tensor
            // is always 468×3 values and the presence score a single value.
            let mut points_raw: Option<Vec<f32>> = None;
            let mut presence_raw: Option<f32> = None;
            for idx in 0..self.num_outputs {
                let Ok((_, data)) = outputs[idx].try_extract_tensor::<f32>() else {
                    continue;
                };
                if data.len() == MESH_COORDS {
                    points_raw = Some(data.to_vec());
                } else if data.len() == 1 {
                    presence_raw = Some(data[0]);
                }
            }

            let raw = points_raw.ok_or(LandmarkerError::NoLandmarkOutput)?;
            let presence = presence_raw.map(squash_presence).unwrap_or(1.0);

            if presence < self.presence_threshold {
                tracing::debug!(presence, "landmark set below presence threshold, dropped");
                continue;
            }

            sets.push(LandmarkSet {
                points: map_points(&raw, &roi, width as f32, height as f32),
                presence,
            });
        }

        Ok(sets)
    }
}

/// Presence score, squashed to `[0, 1]`. Exports disagree on whether the
/// score tensor is already sigmoid-activated.
fn squash_presence(raw: f32) -> f32 {
    if (0.0..=1.0).contains(&raw) {
        raw
    } else {
        1.0 / (1.0 + (-raw).exp())
    }
}

/// Expand a detection box into a square ROI, clamped to the frame.
fn expand_roi(face: &Detection, frame_w: f32, frame_h: f32) -> RoiRect {
    let bw = face.bbox.width * frame_w;
    let bh = face.bbox.height * frame_h;
    let cx = (face.bbox.x + face.bbox.width / 2.0) * frame_w;
    let cy = (face.bbox.y + face.bbox.height / 2.0) * frame_h;

    let side = (bw.max(bh) * MESH_ROI_EXPANSION).max(1.0);

    let x = (cx - side / 2.0).clamp(0.0, (frame_w - 1.0).max(0.0));
    let y = (cy - side / 2.0).clamp(0.0, (frame_h - 1.0).max(0.0));
    let width = side.min(frame_w - x).max(1.0);
    let height = side.min(frame_h - y).max(1.0);

    RoiRect { x, y, width, height }
}

/// Crop the ROI out of the frame and bilinear-resize to the model input.
fn crop_resize_rgb(rgb: &[u8], width: usize, height: usize, roi: &RoiRect) -> Vec<u8> {
    let size = MESH_INPUT_SIZE;
    let mut out = vec![0u8; size * size * 3];

    for y in 0..size {
        let src_y = roi.y + (y as f32 + 0.5) * roi.height / size as f32 - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..size {
            let src_x = roi.x + (x as f32 + 0.5) * roi.width / size as f32 - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            for c in 0..3 {
                let tl = rgb[(y0 * width + x0) * 3 + c] as f32;
                let tr = rgb[(y0 * width + x1) * 3 + c] as f32;
                let bl = rgb[(y1 * width + x0) * 3 + c] as f32;
                let br = rgb[(y1 * width + x1) * 3 + c] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                out[(y * size + x) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

/// Preprocess a 192×192 RGB crop into a NCHW float tensor in `[0, 1]`.
fn preprocess(crop: &[u8]) -> Array4<f32> {
    let size = MESH_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            for c in 0..3 {
                let pixel = crop.get((y * size + x) * 3 + c).copied().unwrap_or(0) as f32;
                tensor[[0, c, y, x]] = pixel / 255.0;
            }
        }
    }

    tensor
}

/// Map raw mesh output (x, y, z triplets in input-pixel units) back to
/// frame-normalized coordinates. `z` stays crop-relative; the overlay only
/// uses x/y.
fn map_points(raw: &[f32], roi: &RoiRect, frame_w: f32, frame_h: f32) -> Vec<LandmarkPoint> {
    let size = MESH_INPUT_SIZE as f32;
    raw.chunks_exact(3)
        .take(MESH_NUM_POINTS)
        .map(|p| LandmarkPoint {
            x: (roi.x + p[0] / size * roi.width) / frame_w,
            y: (roi.y + p[1] / size * roi.height) / frame_h,
            z: p[2] / size,
        })
        .collect()
}
