// SynPad - ARM/Thumb Emulation Core
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Frame output. The core only produces finished RGBA frames; presenting
//! them is left to a [`FramePresenter`].

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 192;
pub const BYTES_PER_PIXEL: usize = 4;
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * BYTES_PER_PIXEL;

/// Row-major RGBA8 frame, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<u8>,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![0; FRAME_BYTES],
        }
    }

    /// Out-of-bounds coordinates are ignored.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return;
        }
        let idx = (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
        self.pixels[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&rgba);
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return None;
        }
        let idx = (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
        let mut rgba = [0; 4];
        rgba.copy_from_slice(&self.pixels[idx..idx + BYTES_PER_PIXEL]);
        Some(rgba)
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn present(&self, presenter: &mut dyn FramePresenter) {
        presenter.render_frame(&self.pixels);
    }
}

/// Receives finished frames between steps. It never writes back into the
/// machine.
pub trait FramePresenter {
    fn render_frame(&mut self, frame: &[u8]);
    fn clear(&mut self);
}

/// Presenter for runs without a display: counts frames and keeps the last one.
#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    frames: u64,
    last: Vec<u8>,
}

impl HeadlessPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames
    }

    pub fn last_frame(&self) -> &[u8] {
        &self.last
    }
}

impl FramePresenter for HeadlessPresenter {
    fn render_frame(&mut self, frame: &[u8]) {
        self.frames += 1;
        self.last.clear();
        self.last.extend_from_slice(frame);
        tracing::trace!("Frame {} presented ({} bytes)", self.frames, frame.len());
    }

    fn clear(&mut self) {
        self.last.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_pixel_is_row_major_rgba() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(1, 2, [10, 20, 30, 255]);

        let idx = (2 * SCREEN_WIDTH + 1) * 4;
        assert_eq!(&fb.as_bytes()[idx..idx + 4], &[10, 20, 30, 255]);
        assert_eq!(fb.pixel(1, 2), Some([10, 20, 30, 255]));
        assert_eq!(fb.as_bytes().len(), FRAME_BYTES);
    }

    #[test]
    fn test_out_of_bounds_pixels_ignored() {
        let mut fb = FrameBuffer::new();
        fb.set_pixel(SCREEN_WIDTH, 0, [1; 4]);
        fb.set_pixel(0, SCREEN_HEIGHT, [1; 4]);
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(fb.pixel(SCREEN_WIDTH, 0), None);
    }

    #[test]
    fn test_headless_presenter() {
        let mut fb = FrameBuffer::new();
        let mut presenter = HeadlessPresenter::new();
        fb.set_pixel(255, 191, [1, 2, 3, 4]);
        fb.present(&mut presenter);
        fb.present(&mut presenter);

        assert_eq!(presenter.frames_presented(), 2);
        assert_eq!(&presenter.last_frame()[FRAME_BYTES - 4..], &[1, 2, 3, 4]);

        fb.clear();
        presenter.clear();
        assert!(presenter.last_frame().is_empty());
        assert!(fb.as_bytes().iter().all(|&b| b == 0));
    }
}
