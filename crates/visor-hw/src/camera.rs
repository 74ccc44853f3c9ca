//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, Frame};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("camera access denied: {0}")]
    PermissionDenied(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Motion-JPEG (one JPEG per frame, common for USB webcams at high resolutions).
    Mjpg,
    /// Packed 24-bit RGB.
    Rgb3,
}

/// V4L2 camera device handle.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    /// Negotiated pixel format.
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0") and negotiate
    /// a format at the requested resolution.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| classify_open_error(device_path, e))?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Request YUYV at the given resolution. Drivers are free to negotiate
        // a different fourcc; MJPG and RGB3 are accepted as well.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = if fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if fourcc == FourCC::new(b"MJPG") {
            PixelFormat::Mjpg
        } else if fourcc == FourCC::new(b"RGB3") {
            PixelFormat::Rgb3
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, or RGB3)"
            )));
        };

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            fourcc,
            pixel_format,
        })
    }

    /// Start a persistent mmap capture stream borrowed from this device.
    ///
    /// A live viewer dequeues continuously, so the stream stays up for the
    /// whole session instead of being created per capture.
    pub fn stream(&self) -> Result<CameraStream<'_>, CameraError> {
        let stream =
            MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4).map_err(|e| {
                CameraError::CaptureFailed(format!("failed to create mmap stream: {e}"))
            })?;

        Ok(CameraStream {
            stream,
            width: self.width,
            height: self.height,
            pixel_format: self.pixel_format,
        })
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

/// Active capture stream tied to an open [`Camera`].
pub struct CameraStream<'a> {
    stream: MmapStream<'a>,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
}

impl CameraStream<'_> {
    /// Dequeue the next frame and convert it to RGB24.
    pub fn next_frame(&mut self) -> Result<Frame, CameraError> {
        let (buf, meta) = self
            .stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;

        let (data, width, height) = match self.pixel_format {
            PixelFormat::Yuyv => {
                let rgb = frame::yuyv_to_rgb(buf, self.width, self.height)
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                (rgb, self.width, self.height)
            }
            PixelFormat::Mjpg => {
                // MJPG buffers carry their own dimensions; trust the decode.
                let (rgb, w, h) = frame::mjpg_to_rgb(buf)
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                (rgb, w, h)
            }
            PixelFormat::Rgb3 => {
                let rgb = frame::rgb3_to_rgb(buf, self.width, self.height)
                    .map_err(|e| CameraError::CaptureFailed(e.to_string()))?;
                (rgb, self.width, self.height)
            }
        };

        Ok(Frame {
            data,
            width,
            height,
            timestamp: std::time::Instant::now(),
            sequence: meta.sequence,
        })
    }
}

/// Map a device-open error onto a structured variant. V4L2 reports both
/// busy and permission failures through the same io::Error channel.
fn classify_open_error(device_path: &str, e: std::io::Error) -> CameraError {
    let msg = e.to_string();
    if e.kind() == std::io::ErrorKind::PermissionDenied || msg.contains("EACCES") {
        CameraError::PermissionDenied(format!("{device_path}: {msg}"))
    } else if msg.contains("busy") || msg.contains("EBUSY") {
        CameraError::DeviceBusy
    } else {
        CameraError::DeviceNotFound(format!("{device_path}: {msg}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "EACCES");
        assert!(matches!(
            classify_open_error("/dev/video0", err),
            CameraError::PermissionDenied(_)
        ));
    }

    #[test]
    fn test_classify_busy() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "EBUSY: device busy");
        assert!(matches!(
            classify_open_error("/dev/video0", err),
            CameraError::DeviceBusy
        ));
    }

    #[test]
    fn test_classify_other_is_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "no such device");
        assert!(matches!(
            classify_open_error("/dev/video9", err),
            CameraError::DeviceNotFound(_)
        ));
    }

    #[test]
    fn test_open_missing_device() {
        let result = Camera::open("/dev/video-does-not-exist", 640, 480);
        assert!(matches!(result, Err(CameraError::DeviceNotFound(_))));
    }
}
