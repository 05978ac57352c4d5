use std::sync::Arc;

/// BGRA color bars, shifted one bar width to the left every 8 frames.
const BARS: [[u8; 4]; 8] = [
    [255, 255, 255, 255], // white
    [0, 255, 255, 255],   // yellow
    [255, 255, 0, 255],   // cyan
    [0, 255, 0, 255],     // green
    [255, 0, 255, 255],   // magenta
    [0, 0, 255, 255],     // red
    [255, 0, 0, 255],     // blue
    [0, 0, 0, 255],       // black
];

pub fn color_bars(width: u32, height: u32, sequence: u64) -> Arc<[u8]> {
    let width = width as usize;
    let height = height as usize;
    let bar_width = (width / BARS.len()).max(1);
    let shift = (sequence / 8) as usize;

    let mut row = Vec::with_capacity(width * 4);
    for x in 0..width {
        let bar = (x / bar_width + shift) % BARS.len();
        row.extend_from_slice(&BARS[bar]);
    }

    let mut data = Vec::with_capacity(row.len() * height);
    for _ in 0..height {
        data.extend_from_slice(&row);
    }
    data.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_tightly_packed_bgra() {
        let data = color_bars(16, 4, 0);
        assert_eq!(data.len(), 16 * 4 * 4);
        // first pixel white, last pixel black
        assert_eq!(&data[0..4], &[255, 255, 255, 255]);
        assert_eq!(&data[60..64], &[0, 0, 0, 255]);
    }

    #[test]
    fn bars_move_over_time() {
        let first = color_bars(16, 1, 0);
        let later = color_bars(16, 1, 8);
        assert_ne!(first, later);
        // shifted by one bar: pixel 0 now shows what was bar 1 (yellow)
        assert_eq!(&later[0..4], &[0, 255, 255, 255]);
    }
}
