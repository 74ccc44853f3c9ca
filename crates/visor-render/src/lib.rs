//! visor-render — Compositing of video frames and annotation overlays.
//!
//! The canvas is an RGB surface sized from the negotiated camera settings.
//! All geometry arrives normalized to `[0,1]`; this crate owns the mapping
//! into canvas pixel space.

pub mod canvas;
pub mod font;
pub mod overlay;
pub mod style;

pub use canvas::Canvas;
pub use overlay::draw_annotations;
pub use style::{parse_hex, OverlayStyle};
