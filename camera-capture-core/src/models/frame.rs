use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pixel layout of a [`VideoFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit B, G, R, A. What Media Foundation hands out as RGB32.
    Bgra8,
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        4
    }
}

/// One frame pushed from the capture session to its output.
///
/// Pixel data is reference counted so fanning a frame out to several
/// preview surfaces never copies it.
#[derive(Clone)]
pub struct VideoFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including padding.
    pub stride: usize,
    pub format: PixelFormat,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl VideoFrame {
    /// Build a tightly packed frame.
    pub fn new(sequence: u64, width: u32, height: u32, format: PixelFormat, data: Arc<[u8]>) -> Self {
        Self {
            sequence,
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            format,
            data,
            captured_at: Instant::now(),
        }
    }

    /// Time since the backend produced this frame.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Whether `data` holds at least `stride * height` bytes.
    pub fn is_complete(&self) -> bool {
        self.data.len() >= self.stride * self.height as usize
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFrame")
            .field("sequence", &self.sequence)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}
