//! visor-hw — Hardware abstraction for camera capture.
//!
//! Provides V4L2-based camera access with format negotiation
//! (YUYV / MJPG / RGB3 → RGB24) and a persistent capture stream
//! for live per-frame consumption.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, DeviceInfo, PixelFormat};
pub use frame::Frame;
