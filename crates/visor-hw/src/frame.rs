//! Frame type and pixel format conversions — YUYV and MJPG to RGB24.

/// A captured camera frame in RGB24.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: std::time::Instant,
    /// Driver sequence number. Unchanged sequence means the driver has not
    /// produced a new frame since the last dequeue.
    pub sequence: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid {format} length: expected {expected}, got {actual}")]
    InvalidLength {
        format: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("MJPG decode failed: {0}")]
    JpegDecode(String),
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]. Both pixels share
/// the U/V chroma pair.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            format: "YUYV",
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as i32 - 128;
        let v = quad[3] as i32 - 128;
        for &y in [quad[0], quad[2]].iter() {
            let c = 298 * (y as i32 - 16);
            let r = (c + 409 * v + 128) >> 8;
            let g = (c - 100 * u - 208 * v + 128) >> 8;
            let b = (c + 516 * u + 128) >> 8;
            rgb.push(r.clamp(0, 255) as u8);
            rgb.push(g.clamp(0, 255) as u8);
            rgb.push(b.clamp(0, 255) as u8);
        }
    }
    Ok(rgb)
}

/// Decode an MJPG buffer to RGB24. Returns pixels and the decoded dimensions,
/// which some drivers report differently from the negotiated format.
pub fn mjpg_to_rgb(jpeg: &[u8]) -> Result<(Vec<u8>, u32, u32), FrameError> {
    let decoded = image::load_from_memory_with_format(jpeg, image::ImageFormat::Jpeg)
        .map_err(|e| FrameError::JpegDecode(e.to_string()))?
        .to_rgb8();
    let (w, h) = decoded.dimensions();
    Ok((decoded.into_raw(), w, h))
}

/// Validate and copy a raw RGB3 buffer.
pub fn rgb3_to_rgb(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 3) as usize;
    if raw.len() < expected {
        return Err(FrameError::InvalidLength {
            format: "RGB3",
            expected,
            actual: raw.len(),
        });
    }
    Ok(raw[..expected].to_vec())
}
