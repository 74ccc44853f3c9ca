//! Overlay styling. Defaults match the original page palette.

/// Colors and stroke parameters for the overlay layer.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub box_color: [u8; 3],
    pub label_color: [u8; 3],
    pub landmark_color: [u8; 3],
    /// Landmark color used when re-annotating for a snapshot.
    pub snapshot_landmark_color: [u8; 3],
    pub box_thickness: u32,
    pub landmark_radius: i32,
    pub label_scale: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: [0xFF, 0x8C, 0x42],
            label_color: [0xFF, 0x3C, 0xAC],
            landmark_color: [0xFF, 0xFF, 0xFF],
            snapshot_landmark_color: [0x00, 0xFF, 0x00],
            box_thickness: 2,
            landmark_radius: 1,
            label_scale: 2,
        }
    }
}

/// Parse a `#RRGGBB` color string. Malformed input falls back to the given
/// default rather than failing the session over a style knob.
pub fn parse_hex(hex: &str, default: [u8; 3]) -> [u8; 3] {
    let s = hex.trim();
    if s.len() == 7 && s.starts_with('#') {
        let r = u8::from_str_radix(&s[1..3], 16);
        let g = u8::from_str_radix(&s[3..5], 16);
        let b = u8::from_str_radix(&s[5..7], 16);
        if let (Ok(r), Ok(g), Ok(b)) = (r, g, b) {
            return [r, g, b];
        }
    }
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000", [0, 0, 0]), [255, 0, 0]);
        assert_eq!(parse_hex("#00ff00", [0, 0, 0]), [0, 255, 0]);
        assert_eq!(parse_hex("#FF8C42", [0, 0, 0]), [0xFF, 0x8C, 0x42]);
    }

    #[test]
    fn test_parse_hex_fallback() {
        assert_eq!(parse_hex("red", [1, 2, 3]), [1, 2, 3]);
        assert_eq!(parse_hex("#GGGGGG", [1, 2, 3]), [1, 2, 3]);
        assert_eq!(parse_hex("#FFF", [1, 2, 3]), [1, 2, 3]);
    }

    #[test]
    fn test_default_palette() {
        let style = OverlayStyle::default();
        assert_eq!(style.box_color, [0xFF, 0x8C, 0x42]);
        assert_eq!(style.label_color, [0xFF, 0x3C, 0xAC]);
        assert_eq!(style.landmark_color, [0xFF, 0xFF, 0xFF]);
        assert_eq!(style.snapshot_landmark_color, [0x00, 0xFF, 0x00]);
    }
}
