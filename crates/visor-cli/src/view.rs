//! Display window for the composed canvas.

use anyhow::{anyhow, Result};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct View {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl View {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let width = width.max(1) as usize;
        let height = height.max(1) as usize;

        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| anyhow!("failed to create window: {e}"))?;
        window.limit_update_rate(Some(std::time::Duration::from_micros(16_600))); // ~60 FPS

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Keys newly pressed since the last update, without auto-repeat.
    pub fn keys_pressed(&self) -> Vec<Key> {
        self.window.get_keys_pressed(KeyRepeat::No)
    }

    /// Present a packed RGB24 buffer of the view's dimensions.
    pub fn present(&mut self, rgb: &[u8]) -> Result<()> {
        for (dst, src) in self.buffer.iter_mut().zip(rgb.chunks_exact(3)) {
            *dst = (src[0] as u32) << 16 | (src[1] as u32) << 8 | src[2] as u32;
        }

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| anyhow!("window update failed: {e}"))
    }
}
