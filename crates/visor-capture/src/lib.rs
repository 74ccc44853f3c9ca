//! visor-capture — Recording and snapshot export for the composed canvas.
//!
//! The recorder buffers one independently encoded JPEG segment per pushed
//! frame; saving wraps the ordered segments into an MJPEG AVI container.
//! Codec work stays delegated to the `image` crate's encoders.

pub mod avi;
pub mod recorder;
pub mod snapshot;

pub use recorder::{CaptureError, Recorder, RecorderState};
pub use snapshot::{timestamped_name, write_snapshot};
