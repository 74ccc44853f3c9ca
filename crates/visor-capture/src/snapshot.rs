//! Still snapshot export of the composed canvas.

use crate::recorder::CaptureError;
use std::path::Path;

/// Write the composed RGB24 canvas as a PNG file.
pub fn write_snapshot(rgb: &[u8], width: u32, height: u32, path: &Path) -> Result<(), CaptureError> {
    let expected = (width * height * 3) as usize;
    if rgb.len() < expected {
        return Err(CaptureError::BadFrame {
            expected,
            actual: rgb.len(),
        });
    }

    let img = image::RgbImage::from_raw(width, height, rgb[..expected].to_vec())
        .ok_or(CaptureError::BadFrame {
            expected,
            actual: rgb.len(),
        })?;
    img.save(path)?;

    tracing::info!(path = %path.display(), width, height, "snapshot saved");
    Ok(())
}

/// Timestamped output filename, e.g. `snapshot-20250316-142305.png`.
pub fn timestamped_name(prefix: &str, ext: &str) -> String {
    format!(
        "{prefix}-{}.{ext}",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.png");

        let mut rgb = vec![0u8; 4 * 4 * 3];
        rgb[0] = 255; // top-left pixel red

        write_snapshot(&rgb, 4, 4, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(3, 3).0, [0, 0, 0]);
    }

    #[test]
    fn test_snapshot_short_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.png");
        let err = write_snapshot(&[0u8; 5], 4, 4, &path);
        assert!(matches!(err, Err(CaptureError::BadFrame { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_timestamped_name_shape() {
        let name = timestamped_name("recording", "avi");
        assert!(name.starts_with("recording-"));
        assert!(name.ends_with(".avi"));
        // prefix + '-' + yyyymmdd + '-' + hhmmss + '.avi'
        assert_eq!(name.len(), "recording-".len() + 15 + ".avi".len());
    }
}
