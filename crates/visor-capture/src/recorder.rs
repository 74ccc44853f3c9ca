//! Recording state machine over the composed canvas.
//!
//! Mirrors the platform media-recorder contract: start only when inactive,
//! stop only while recording, and segments accumulate until saved — a new
//! recording appends to the previous take rather than discarding it.

use crate::avi;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("recording is already in progress")]
    AlreadyRecording,
    #[error("no recording in progress")]
    NotRecording,
    #[error("stop the recording before saving")]
    StillRecording,
    #[error("no recording available — record something first")]
    NoData,
    #[error("frame size {actual_w}x{actual_h} does not match recording size {expected_w}x{expected_h}")]
    DimensionMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
    #[error("frame buffer too short: expected {expected}, got {actual}")]
    BadFrame { expected: usize, actual: usize },
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
}

/// Buffers encoded segments of the composed canvas and exports them as an
/// MJPEG AVI on demand.
pub struct Recorder {
    state: RecorderState,
    segments: Vec<Vec<u8>>,
    /// Pinned by the first pushed frame; the container needs one extent.
    dims: Option<(u32, u32)>,
    fps: u32,
    jpeg_quality: u8,
}

impl Recorder {
    pub fn new(fps: u32, jpeg_quality: u8) -> Self {
        Self {
            state: RecorderState::Inactive,
            segments: Vec::new(),
            dims: None,
            fps: fps.max(1),
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Begin recording. Only valid while inactive.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::AlreadyRecording);
        }
        self.state = RecorderState::Recording;
        tracing::info!("recording started");
        Ok(())
    }

    /// Stop recording. Only valid while recording.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }
        self.state = RecorderState::Inactive;
        tracing::info!(segments = self.segments.len(), "recording stopped");
        Ok(())
    }

    /// Encode one composed RGB24 frame as a JPEG segment.
    pub fn push_frame(&mut self, rgb: &[u8], width: u32, height: u32) -> Result<(), CaptureError> {
        if !self.is_recording() {
            return Err(CaptureError::NotRecording);
        }

        let expected = (width * height * 3) as usize;
        if rgb.len() < expected {
            return Err(CaptureError::BadFrame {
                expected,
                actual: rgb.len(),
            });
        }

        match self.dims {
            None => self.dims = Some((width, height)),
            Some((w, h)) if (w, h) != (width, height) => {
                return Err(CaptureError::DimensionMismatch {
                    expected_w: w,
                    expected_h: h,
                    actual_w: width,
                    actual_h: height,
                });
            }
            Some(_) => {}
        }

        let mut segment = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut segment, self.jpeg_quality)
            .encode(&rgb[..expected], width, height, image::ExtendedColorType::Rgb8)?;
        self.segments.push(segment);
        Ok(())
    }

    /// Export all buffered segments as an MJPEG AVI file.
    ///
    /// Refused while recording and when nothing was recorded; the caller
    /// surfaces both as user-facing warnings, not failures.
    pub fn save_to(&self, path: &Path) -> Result<(), CaptureError> {
        if self.is_recording() {
            return Err(CaptureError::StillRecording);
        }
        if self.segments.is_empty() {
            return Err(CaptureError::NoData);
        }

        let (width, height) = self.dims.unwrap_or((0, 0));
        let mut out = BufWriter::new(File::create(path)?);
        avi::write_mjpeg(&mut out, width, height, self.fps, &self.segments)?;

        tracing::info!(
            path = %path.display(),
            segments = self.segments.len(),
            "recording saved"
        );
        Ok(())
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(DEFAULT_FPS, DEFAULT_JPEG_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_frame(w: u32, h: u32) -> Vec<u8> {
        vec![128u8; (w * h * 3) as usize]
    }

    #[test]
    fn test_start_stop_transitions() {
        let mut rec = Recorder::default();
        assert_eq!(rec.state(), RecorderState::Inactive);

        rec.start().unwrap();
        assert_eq!(rec.state(), RecorderState::Recording);
        // Starting twice is a state error, not a restart
        assert!(matches!(rec.start(), Err(CaptureError::AlreadyRecording)));

        rec.stop().unwrap();
        assert_eq!(rec.state(), RecorderState::Inactive);
        assert!(matches!(rec.stop(), Err(CaptureError::NotRecording)));
    }

    #[test]
    fn test_push_requires_recording() {
        let mut rec = Recorder::default();
        let err = rec.push_frame(&rgb_frame(4, 4), 4, 4);
        assert!(matches!(err, Err(CaptureError::NotRecording)));
        assert_eq!(rec.segment_count(), 0);
    }

    #[test]
    fn test_push_buffers_segments() {
        let mut rec = Recorder::default();
        rec.start().unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();
        assert_eq!(rec.segment_count(), 2);
    }

    #[test]
    fn test_push_rejects_dimension_change() {
        let mut rec = Recorder::default();
        rec.start().unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();
        let err = rec.push_frame(&rgb_frame(4, 4), 4, 4);
        assert!(matches!(err, Err(CaptureError::DimensionMismatch { .. })));
        assert_eq!(rec.segment_count(), 1);
    }

    #[test]
    fn test_push_rejects_short_buffer() {
        let mut rec = Recorder::default();
        rec.start().unwrap();
        let err = rec.push_frame(&[0u8; 3], 8, 8);
        assert!(matches!(err, Err(CaptureError::BadFrame { .. })));
    }

    #[test]
    fn test_save_refused_while_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut rec = Recorder::default();
        rec.start().unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();

        let err = rec.save_to(&path);
        assert!(matches!(err, Err(CaptureError::StillRecording)));
        assert!(!path.exists(), "refused save must not create a file");
    }

    #[test]
    fn test_save_refused_with_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let rec = Recorder::default();
        let err = rec.save_to(&path);
        assert!(matches!(err, Err(CaptureError::NoData)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_writes_avi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut rec = Recorder::default();
        rec.start().unwrap();
        rec.push_frame(&rgb_frame(16, 16), 16, 16).unwrap();
        rec.stop().unwrap();
        rec.save_to(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"AVI ");
    }

    #[test]
    fn test_segments_accumulate_across_sessions() {
        // A second take appends to the first; nothing is discarded on start
        let mut rec = Recorder::default();
        rec.start().unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();
        rec.stop().unwrap();

        rec.start().unwrap();
        rec.push_frame(&rgb_frame(8, 8), 8, 8).unwrap();
        rec.stop().unwrap();

        assert_eq!(rec.segment_count(), 2);
    }
}
