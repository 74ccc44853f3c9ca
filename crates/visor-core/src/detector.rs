//! Short-range face detector via ONNX Runtime.
//!
//! Implements the BlazeFace-style single-shot detector: a fixed SSD anchor
//! grid over two feature map strides, center/size regression per anchor,
//! sigmoid scoring and greedy NMS. Outputs are normalized to the original
//! frame so callers own the mapping into their drawing surface.

use crate::types::{Detection, NormalizedBox};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants (no magic numbers) ---
const BLAZE_INPUT_SIZE: usize = 128;
const BLAZE_MEAN: f32 = 127.5;
const BLAZE_STD: f32 = 127.5;
const BLAZE_SCORE_CLAMP: f32 = 80.0;
const BLAZE_NUM_KEYPOINTS: usize = 6;
/// Regressor layout per anchor: [cx, cy, w, h] + 6 keypoint (x, y) pairs.
const BLAZE_COORDS_PER_ANCHOR: usize = 16;
/// (stride, anchors per cell) for the two output layers.
const BLAZE_ANCHOR_LAYERS: [(usize, usize); 2] = [(8, 2), (16, 6)];

const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;
const DEFAULT_NMS_THRESHOLD: f32 = 0.3;
const DEFAULT_INTRA_THREADS: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — place the face detection ONNX export in the model dir")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame buffer too short: expected {expected}, got {actual}")]
    BadFrame { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Fixed initialization options. Set once when a session starts.
#[derive(Debug, Clone)]
pub struct DetectorOptions {
    pub model_path: String,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub intra_threads: usize,
}

impl DetectorOptions {
    pub fn new(model_path: impl Into<String>) -> Self {
        Self {
            model_path: model_path.into(),
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Short-range face detector.
pub struct FaceDetector {
    session: Session,
    anchors: Vec<(f32, f32)>,
    score_threshold: f32,
    nms_threshold: f32,
    /// (regressors, scores) output tensor indices. Discovered by name at
    /// load time; falls back to positional ordering.
    output_indices: (usize, usize),
}

impl FaceDetector {
    /// Load the face detection ONNX model.
    pub fn load(options: &DetectorOptions) -> Result<Self, DetectorError> {
        if !Path::new(&options.model_path).exists() {
            return Err(DetectorError::ModelNotFound(options.model_path.clone()));
        }

        let session = Session::builder()?
            .with_intra_threads(options.intra_threads)
            .map_err(<ort::Error>::from)?
            .commit_from_file(&options.model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = %options.model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?output_names,
            "loaded face detection model"
        );

        if output_names.len() < 2 {
            return Err(DetectorError::InferenceFailed(format!(
                "detector requires 2 outputs (regressors, scores), got {}",
                output_names.len()
            )));
        }

        let output_indices = discover_output_indices(&output_names);
        tracing::debug!(?output_indices, "detector output tensor mapping");

        Ok(Self {
            session,
            anchors: generate_anchors(),
            score_threshold: options.score_threshold,
            nms_threshold: options.nms_threshold,
            output_indices,
        })
    }

    /// Detect faces in an RGB24 frame, returning normalized detections
    /// sorted by confidence.
    pub fn detect(
        &mut self,
        rgb: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<Detection>, DetectorError> {
        let expected = (width * height * 3) as usize;
        if rgb.len() < expected {
            return Err(DetectorError::BadFrame {
                expected,
                actual: rgb.len(),
            });
        }

        let (input, letterbox) = preprocess(rgb, width as usize, height as usize);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (reg_idx, score_idx) = self.output_indices;
        let (_, regressors) = outputs[reg_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("regressors: {e}")))?;
        let (_, scores) = outputs[score_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;

        let detections = decode_detections(
            scores,
            regressors,
            &self.anchors,
            &letterbox,
            width as f32,
            height as f32,
            self.score_threshold,
        );

        let mut result = nms(detections, self.nms_threshold);
        result.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(result)
    }
}

/// Generate the fixed SSD anchor centers in input-normalized coordinates.
///
/// Two layers over a 128×128 input: stride 8 (16×16 cells, 2 anchors each)
/// and stride 16 (8×8 cells, 6 anchors each) — 896 anchors total, all with
/// unit extent.
fn generate_anchors() -> Vec<(f32, f32)> {
    let mut anchors = Vec::new();
    for &(stride, per_cell) in BLAZE_ANCHOR_LAYERS.iter() {
        let grid = BLAZE_INPUT_SIZE / stride;
        for row in 0..grid {
            for col in 0..grid {
                let cx = (col as f32 + 0.5) / grid as f32;
                let cy = (row as f32 + 0.5) / grid as f32;
                for _ in 0..per_cell {
                    anchors.push((cx, cy));
                }
            }
        }
    }
    anchors
}

/// Discover output tensor ordering by name.
///
/// Exports of this detector family name the tensors "regressors" and
/// "classificators"; generic numeric names fall back to the standard
/// positional ordering [0]=regressors, [1]=scores.
fn discover_output_indices(names: &[String]) -> (usize, usize) {
    let reg = names.iter().position(|n| n.contains("regressor"));
    let score = names.iter().position(|n| n.contains("classificator") || n.contains("score"));

    match (reg, score) {
        (Some(r), Some(s)) if r != s => {
            tracing::info!("detector: using name-based output tensor mapping");
            (r, s)
        }
        _ => {
            tracing::info!(
                ?names,
                "detector: output names not recognized, using positional mapping [0]=regressors, [1]=scores"
            );
            (0, 1)
        }
    }
}

/// Preprocess an RGB24 frame into a NCHW float tensor with letterbox padding.
///
/// Resizes with bilinear interpolation, pads with the mean value (which
/// normalizes to 0.0), and maps pixels to `[-1, 1]`.
fn preprocess(rgb: &[u8], width: usize, height: usize) -> (Array4<f32>, LetterboxInfo) {
    let input = BLAZE_INPUT_SIZE;
    let scale_w = input as f32 / width as f32;
    let scale_h = input as f32 / height as f32;
    let scale = scale_w.min(scale_h);

    let new_w = (width as f32 * scale).round() as usize;
    let new_h = (height as f32 * scale).round() as usize;
    let pad_x = (input - new_w) as f32 / 2.0;
    let pad_y = (input - new_h) as f32 / 2.0;

    let letterbox = LetterboxInfo { scale, pad_x, pad_y };

    let resized = bilinear_resize_rgb(rgb, width, height, new_w, new_h);

    let pad_x_start = pad_x.floor() as usize;
    let pad_y_start = pad_y.floor() as usize;

    let mut tensor = Array4::<f32>::zeros((1, 3, input, input));

    for y in 0..input {
        for x in 0..input {
            let in_content = y >= pad_y_start
                && y < pad_y_start + new_h
                && x >= pad_x_start
                && x < pad_x_start + new_w;

            for c in 0..3 {
                let pixel = if in_content {
                    resized[((y - pad_y_start) * new_w + (x - pad_x_start)) * 3 + c] as f32
                } else {
                    BLAZE_MEAN // pad value normalizes to 0.0
                };
                tensor[[0, c, y, x]] = (pixel - BLAZE_MEAN) / BLAZE_STD;
            }
        }
    }

    (tensor, letterbox)
}

/// Bilinear resize of packed RGB24 data.
fn bilinear_resize_rgb(
    rgb: &[u8],
    width: usize,
    height: usize,
    new_w: usize,
    new_h: usize,
) -> Vec<u8> {
    let scale_x = width as f32 / new_w as f32;
    let scale_y = height as f32 / new_h as f32;
    let mut out = vec![0u8; new_w * new_h * 3];

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
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

                out[(y * new_w + x) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    out
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Map a letterbox-normalized coordinate back to frame-normalized space.
fn to_frame_norm(lb_coord: f32, pad: f32, scale: f32, frame_dim: f32) -> f32 {
    (lb_coord * BLAZE_INPUT_SIZE as f32 - pad) / scale / frame_dim
}

/// Decode raw regressor/score tensors into normalized detections.
///
/// Regressor values are offsets from the anchor center in input pixels;
/// anchors have unit extent, so width/height decode without an exp term.
fn decode_detections(
    scores: &[f32],
    regressors: &[f32],
    anchors: &[(f32, f32)],
    letterbox: &LetterboxInfo,
    frame_w: f32,
    frame_h: f32,
    threshold: f32,
) -> Vec<Detection> {
    let input = BLAZE_INPUT_SIZE as f32;
    let mut detections = Vec::new();

    for (idx, &(anchor_cx, anchor_cy)) in anchors.iter().enumerate() {
        let Some(&raw_score) = scores.get(idx) else {
            break;
        };
        let score = sigmoid(raw_score.clamp(-BLAZE_SCORE_CLAMP, BLAZE_SCORE_CLAMP));
        if score < threshold {
            continue;
        }

        let base = idx * BLAZE_COORDS_PER_ANCHOR;
        if base + BLAZE_COORDS_PER_ANCHOR > regressors.len() {
            break;
        }

        let cx = anchor_cx + regressors[base] / input;
        let cy = anchor_cy + regressors[base + 1] / input;
        let bw = regressors[base + 2] / input;
        let bh = regressors[base + 3] / input;

        let x0 = to_frame_norm(cx - bw / 2.0, letterbox.pad_x, letterbox.scale, frame_w);
        let y0 = to_frame_norm(cy - bh / 2.0, letterbox.pad_y, letterbox.scale, frame_h);
        let x1 = to_frame_norm(cx + bw / 2.0, letterbox.pad_x, letterbox.scale, frame_w);
        let y1 = to_frame_norm(cy + bh / 2.0, letterbox.pad_y, letterbox.scale, frame_h);

        let mut keypoints = [(0.0f32, 0.0f32); BLAZE_NUM_KEYPOINTS];
        for (k, kp) in keypoints.iter_mut().enumerate() {
            let kx = anchor_cx + regressors[base + 4 + k * 2] / input;
            let ky = anchor_cy + regressors[base + 4 + k * 2 + 1] / input;
            *kp = (
                to_frame_norm(kx, letterbox.pad_x, letterbox.scale, frame_w),
                to_frame_norm(ky, letterbox.pad_y, letterbox.scale, frame_h),
            );
        }

        detections.push(Detection {
            bbox: NormalizedBox {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            },
            score,
            keypoints: Some(keypoints),
        });
    }

    detections
}

/// Non-Maximum Suppression: remove overlapping detections.
fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] {
                continue;
            }
            if iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection-over-Union between two normalized boxes.
fn iou(a: &NormalizedBox, b: &NormalizedBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_w = (x2 - x1).max(0.0);
    let inter_h = (y2 - y1).max(0.0);
    let inter_area = inter_w * inter_h;

    let area_a = a.width * a.height;
    let area_b = b.width * b.height;
    let union_area = area_a + area_b - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_det(x: f32, y: f32, w: f32, h: f32, score: f32) -> Detection {
        Detection {
            bbox: NormalizedBox { x, y, width: w, height: h },
            score,
            keypoints: None,
        }
    }

    #[test]
    fn test_anchor_count() {
        let anchors = generate_anchors();
        // 16*16*2 + 8*8*6
        assert_eq!(anchors.len(), 896);
    }

    #[test]
    fn test_anchor_centers_in_unit_square() {
        for (cx, cy) in generate_anchors() {
            assert!((0.0..=1.0).contains(&cx));
            assert!((0.0..=1.0).contains(&cy));
        }
    }

    #[test]
    fn test_first_anchor_center() {
        // First cell of the stride-8 layer: (0.5/16, 0.5/16)
        let anchors = generate_anchors();
        let (cx, cy) = anchors[0];
        assert!((cx - 0.03125).abs() < 1e-6);
        assert!((cy - 0.03125).abs() < 1e-6);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(10.0) + sigmoid(-10.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_discover_output_indices_named() {
        let names = vec!["classificators".to_string(), "regressors".to_string()];
        assert_eq!(discover_output_indices(&names), (1, 0));
    }

    #[test]
    fn test_discover_output_indices_positional_fallback() {
        let names = vec!["430".to_string(), "431".to_string()];
        assert_eq!(discover_output_indices(&names), (0, 1));
    }

    #[test]
    fn test_decode_single_anchor() {
        // Square frame, no letterbox padding: scale = 1.0 against a
        // synthetic 128x128 frame.
        let letterbox = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        let anchors = vec![(0.5f32, 0.5f32)];

        // Offsets: center shifted +16px, 32x32 box
        let mut regressors = vec![0.0f32; BLAZE_COORDS_PER_ANCHOR];
        regressors[0] = 16.0;
        regressors[1] = 16.0;
        regressors[2] = 32.0;
        regressors[3] = 32.0;
        let scores = vec![10.0f32]; // sigmoid(10) ≈ 1.0

        let dets = decode_detections(&scores, &regressors, &anchors, &letterbox, 128.0, 128.0, 0.5);
        assert_eq!(dets.len(), 1);
        let b = &dets[0].bbox;
        // center (0.625, 0.625), extent 0.25
        assert!((b.x - 0.5).abs() < 1e-5);
        assert!((b.y - 0.5).abs() < 1e-5);
        assert!((b.width - 0.25).abs() < 1e-5);
        assert!((b.height - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_decode_below_threshold_is_dropped() {
        let letterbox = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        let anchors = vec![(0.5f32, 0.5f32)];
        let regressors = vec![0.0f32; BLAZE_COORDS_PER_ANCHOR];
        let scores = vec![-10.0f32]; // sigmoid(-10) ≈ 0.0

        let dets = decode_detections(&scores, &regressors, &anchors, &letterbox, 128.0, 128.0, 0.5);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_keypoints_track_anchor() {
        let letterbox = LetterboxInfo { scale: 1.0, pad_x: 0.0, pad_y: 0.0 };
        let anchors = vec![(0.25f32, 0.75f32)];
        let mut regressors = vec![0.0f32; BLAZE_COORDS_PER_ANCHOR];
        regressors[2] = 16.0;
        regressors[3] = 16.0;
        let scores = vec![10.0f32];

        let dets = decode_detections(&scores, &regressors, &anchors, &letterbox, 128.0, 128.0, 0.5);
        let kps = dets[0].keypoints.unwrap();
        // Zero offsets put every keypoint at the anchor center
        for (kx, ky) in kps {
            assert!((kx - 0.25).abs() < 1e-5);
            assert!((ky - 0.75).abs() < 1e-5);
        }
    }

    #[test]
    fn test_letterbox_coordinate_roundtrip() {
        // 320x240 frame letterboxed into 128x128
        let width = 320.0f32;
        let height = 240.0f32;
        let scale = (128.0 / width).min(128.0 / height);
        let new_w = (width * scale).round();
        let new_h = (height * scale).round();
        let pad_x = (128.0 - new_w) / 2.0;
        let pad_y = (128.0 - new_h) / 2.0;
        let letterbox = LetterboxInfo { scale, pad_x, pad_y };

        // A frame-space point mapped into letterbox space and back
        let fx = 100.0f32;
        let fy = 50.0f32;
        let lb_x = (fx * scale + pad_x) / 128.0;
        let lb_y = (fy * scale + pad_y) / 128.0;

        let nx = to_frame_norm(lb_x, letterbox.pad_x, letterbox.scale, width);
        let ny = to_frame_norm(lb_y, letterbox.pad_y, letterbox.scale, height);

        assert!((nx * width - fx).abs() < 0.1, "x: {} vs {fx}", nx * width);
        assert!((ny * height - fy).abs() < 0.1, "y: {} vs {fy}", ny * height);
    }

    #[test]
    fn test_bilinear_resize_uniform() {
        let rgb = vec![77u8; 10 * 10 * 3];
        let out = bilinear_resize_rgb(&rgb, 10, 10, 24, 24);
        assert_eq!(out.len(), 24 * 24 * 3);
        assert!(out.iter().all(|&p| p == 77), "uniform resize should stay uniform");
    }

    #[test]
    fn test_preprocess_pad_is_zero() {
        // Wide frame: vertical padding regions should normalize to 0.0
        let rgb = vec![255u8; 64 * 16 * 3];
        let (tensor, letterbox) = preprocess(&rgb, 64, 16);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
        assert!(letterbox.pad_y > 0.0);
        assert!(tensor[[0, 0, 0, 64]].abs() < 1e-6);
        // Content region maps 255 → 1.0
        assert!((tensor[[0, 0, 64, 64]] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let detections = vec![
            make_det(0.0, 0.0, 0.5, 0.5, 0.9),
            make_det(0.02, 0.02, 0.5, 0.5, 0.8),
            make_det(0.7, 0.7, 0.2, 0.2, 0.7),
        ];
        let result = nms(detections, 0.3);
        assert_eq!(result.len(), 2);
        assert!((result[0].score - 0.9).abs() < 1e-6);
        assert!((result[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_no_suppression() {
        let detections = vec![
            make_det(0.0, 0.0, 0.1, 0.1, 0.9),
            make_det(0.5, 0.5, 0.1, 0.1, 0.8),
        ];
        assert_eq!(nms(detections, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.3).is_empty());
    }

    #[test]
    fn test_iou_identical() {
        let a = NormalizedBox { x: 0.1, y: 0.1, width: 0.4, height: 0.4 };
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = NormalizedBox { x: 0.0, y: 0.0, width: 0.2, height: 0.2 };
        let b = NormalizedBox { x: 0.5, y: 0.5, width: 0.2, height: 0.2 };
        assert!(iou(&a, &b).abs() < 1e-6);
    }
}
