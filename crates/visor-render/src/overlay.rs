//! Drawing of annotation geometry onto the canvas.
//!
//! Detection boxes get a stroked rectangle and a confidence label placed
//! above the box unless it sits within 20px of the top edge, in which case
//! the label drops below the box's top — the original viewer behavior.

use crate::canvas::Canvas;
use crate::font;
use crate::style::OverlayStyle;
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use visor_core::{Detection, FrameAnnotations, LandmarkSet};

/// Draw a full annotation result over the composed frame.
pub fn draw_annotations(canvas: &mut Canvas, annotations: &FrameAnnotations, style: &OverlayStyle) {
    match annotations {
        FrameAnnotations::None => {}
        FrameAnnotations::Detections(dets) => {
            for det in dets {
                draw_detection(canvas, det, style);
            }
        }
        FrameAnnotations::LandmarkSets(sets) => {
            for set in sets {
                draw_landmark_set(canvas, set, style.landmark_color, style);
            }
        }
    }
}

/// Stroke a detection box and its confidence label.
pub fn draw_detection(canvas: &mut Canvas, det: &Detection, style: &OverlayStyle) {
    let (x0, y0) = canvas.map_point(det.bbox.x, det.bbox.y);
    let (x1, y1) = canvas.map_point(det.bbox.x + det.bbox.width, det.bbox.y + det.bbox.height);
    let w = (x1 - x0).max(1) as u32;
    let h = (y1 - y0).max(1) as u32;

    for t in 0..style.box_thickness as i32 {
        let (tw, th) = (w as i32 - 2 * t, h as i32 - 2 * t);
        if tw <= 0 || th <= 0 {
            break;
        }
        let rect = Rect::at(x0 + t, y0 + t).of_size(tw as u32, th as u32);
        draw_hollow_rect_mut(canvas.image_mut(), rect, Rgb(style.box_color));
    }

    let label = format!("Confidence: {:.2}%", det.score * 100.0);
    let font_h = font::text_height(style.label_scale) as i32;
    let label_y = label_origin(y0, font_h);
    font::draw_text(canvas.image_mut(), x0, label_y, &label, style.label_color, style.label_scale);
}

/// Top coordinate for a box label: above the box when there is room,
/// below its top edge otherwise.
pub fn label_origin(box_y: i32, font_h: i32) -> i32 {
    if box_y > 20 {
        box_y - 10 - font_h
    } else {
        box_y + 20 - font_h
    }
}

/// Fill one dot per landmark point.
pub fn draw_landmark_set(canvas: &mut Canvas, set: &LandmarkSet, color: [u8; 3], style: &OverlayStyle) {
    for point in &set.points {
        let (x, y) = canvas.map_point(point.x, point.y);
        draw_filled_circle_mut(canvas.image_mut(), (x, y), style.landmark_radius, Rgb(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visor_core::{LandmarkPoint, NormalizedBox};

    fn make_det(x: f32, y: f32, w: f32, h: f32, score: f32) -> Detection {
        Detection {
            bbox: NormalizedBox { x, y, width: w, height: h },
            score,
            keypoints: None,
        }
    }

    #[test]
    fn test_label_above_when_room() {
        let y = label_origin(100, 14);
        assert!(y < 100);
        assert_eq!(y, 76);
    }

    #[test]
    fn test_label_below_near_top_edge() {
        let y = label_origin(10, 14);
        assert!(y >= 10);
        assert_eq!(y, 16);
    }

    #[test]
    fn test_draw_detection_strokes_box_color() {
        let mut canvas = Canvas::new(100, 100);
        let style = OverlayStyle::default();
        draw_detection(&mut canvas, &make_det(0.2, 0.4, 0.4, 0.4, 0.9), &style);

        // Top-left corner of the stroked rect
        assert_eq!(canvas.image().get_pixel(20, 40).0, style.box_color);
        // Interior stays untouched
        assert_eq!(canvas.image().get_pixel(40, 60).0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_detection_out_of_range_box_is_clamped() {
        // A box reaching past the frame must not panic and must stay on-canvas
        let mut canvas = Canvas::new(64, 64);
        let style = OverlayStyle::default();
        draw_detection(&mut canvas, &make_det(0.9, 0.9, 0.5, 0.5, 0.5), &style);
        draw_detection(&mut canvas, &make_det(-0.2, -0.2, 0.3, 0.3, 0.5), &style);
    }

    #[test]
    fn test_draw_landmark_set_colors_points() {
        let mut canvas = Canvas::new(100, 100);
        let style = OverlayStyle::default();
        let set = LandmarkSet {
            points: vec![LandmarkPoint { x: 0.5, y: 0.5, z: 0.0 }],
            presence: 0.9,
        };
        draw_landmark_set(&mut canvas, &set, [0, 255, 0], &style);
        assert_eq!(canvas.image().get_pixel(50, 50).0, [0, 255, 0]);
    }

    #[test]
    fn test_draw_annotations_none_is_noop() {
        let mut canvas = Canvas::new(16, 16);
        draw_annotations(&mut canvas, &FrameAnnotations::None, &OverlayStyle::default());
        assert!(canvas.data().iter().all(|&b| b == 0));
    }
}
