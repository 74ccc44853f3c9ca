//! On-screen control surface.
//!
//! The HUD is drawn on the presented copy only — recordings and snapshots
//! keep the clean composition, matching the original pages where the
//! buttons lived outside the canvas.

use visor_render::{font, Canvas};

const HUD_X: i32 = 10;
const HUD_Y: i32 = 10;
const HUD_SCALE: u32 = 2;
const HUD_COLOR: [u8; 3] = [0xFF, 0xFF, 0xFF];
const HUD_ACTIVE_COLOR: [u8; 3] = [0xFF, 0x3C, 0xAC];

/// The record control shows exactly one of its two labels at any time.
pub fn record_label(recording: bool) -> &'static str {
    if recording {
        "[R] Stop Recording"
    } else {
        "[R] Start Recording"
    }
}

/// Draw the key legend onto the presented canvas.
pub fn draw(canvas: &mut Canvas, recording: bool) {
    let line_height = (font::text_height(HUD_SCALE) + 6) as i32;
    let mut y = HUD_Y;

    let record_color = if recording { HUD_ACTIVE_COLOR } else { HUD_COLOR };
    font::draw_text(canvas.image_mut(), HUD_X, y, record_label(recording), record_color, HUD_SCALE);
    y += line_height;

    for line in ["[S] Save Recording", "[P] Take Snapshot", "[Q] Home"] {
        font::draw_text(canvas.image_mut(), HUD_X, y, line, HUD_COLOR, HUD_SCALE);
        y += line_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_one_record_label() {
        let idle = record_label(false);
        let active = record_label(true);
        assert_ne!(idle, active);
        assert!(idle.contains("Start"));
        assert!(!idle.contains("Stop"));
        assert!(active.contains("Stop"));
        assert!(!active.contains("Start"));
    }

    #[test]
    fn test_draw_marks_canvas() {
        let mut canvas = Canvas::new(320, 240);
        draw(&mut canvas, false);
        assert!(canvas.data().iter().any(|&b| b != 0));
    }
}
