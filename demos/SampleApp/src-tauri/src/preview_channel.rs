use std::time::Duration;

use tauri::ipc::{Channel, InvokeResponseBody};

use camera_capture_core::{FrameRenderer, PixelFormat, PreviewLayout, VideoFrame};

/// Frames wider than this are subsampled before crossing the IPC bridge.
const MAX_WIRE_WIDTH: u32 = 640;

/// Frames older than this when they reach the renderer are skipped; the
/// web view has fallen behind and a newer frame is already on its way.
const MAX_FRAME_AGE: Duration = Duration::from_millis(250);

/// Size of the header in front of the pixels.
pub const HEADER_LEN: usize = 28;

/// FrameRenderer that streams preview frames to the web view.
///
/// Each message is one binary frame:
///
/// ```text
/// 0..4    width   (u32 LE, pixels after subsampling)
/// 4..8    height  (u32 LE)
/// 8       mirrored (0 or 1)
/// 12..28  source crop x, y, w, h (f32 LE, subsampled pixels)
/// 28..    RGBA pixels, row major
/// ```
///
/// The page draws the crop full screen and flips it when mirrored.
pub struct ChannelRenderer {
    channel: Channel,
}

impl ChannelRenderer {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl FrameRenderer for ChannelRenderer {
    fn render(&self, frame: &VideoFrame, layout: &PreviewLayout) {
        if is_stale(frame) {
            log::trace!("Skipping stale preview frame {}", frame.sequence);
            return;
        }
        let Some(message) = encode(frame, layout) else {
            return;
        };
        if let Err(e) = self.channel.send(InvokeResponseBody::Raw(message)) {
            log::debug!("Dropping preview frame {}: {}", frame.sequence, e);
        }
    }
}

fn is_stale(frame: &VideoFrame) -> bool {
    frame.age() > MAX_FRAME_AGE
}

fn encode(frame: &VideoFrame, layout: &PreviewLayout) -> Option<Vec<u8>> {
    if frame.is_empty() || !frame.is_complete() {
        return None;
    }

    let step = frame.width.div_ceil(MAX_WIRE_WIDTH).max(1);
    let width = frame.width / step;
    let height = frame.height / step;
    let scale = 1.0 / step as f32;
    let crop = layout.source_crop;

    let mut out = Vec::with_capacity(HEADER_LEN + (width * height * 4) as usize);
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&[u8::from(layout.mirrored), 0, 0, 0]);
    for value in [crop.x, crop.y, crop.width, crop.height] {
        out.extend_from_slice(&(value * scale).to_le_bytes());
    }

    for y in 0..height {
        let row = (y * step) as usize * frame.stride;
        for x in 0..width {
            let i = row + (x * step) as usize * 4;
            let px = &frame.data[i..i + 4];
            match frame.format {
                PixelFormat::Bgra8 => out.extend_from_slice(&[px[2], px[1], px[0], px[3]]),
                PixelFormat::Rgba8 => out.extend_from_slice(px),
            }
        }
    }
    Some(out)
}
