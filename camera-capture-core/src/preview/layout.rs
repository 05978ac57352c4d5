use serde::{Deserialize, Serialize};

use crate::models::config::VideoGravity;

/// Pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn from_size(size: Size) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: size.width as f32,
            height: size.height as f32,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Where a frame lands on a preview surface.
///
/// `source_crop` (frame pixels) is drawn into `destination` (surface
/// pixels), flipped horizontally when `mirrored` is set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewLayout {
    pub bounds: Size,
    pub source_crop: Rect,
    pub destination: Rect,
    pub gravity: VideoGravity,
    pub mirrored: bool,
}

impl PreviewLayout {
    pub fn compute(frame: Size, bounds: Size, gravity: VideoGravity, mirrored: bool) -> Self {
        let source = Rect::from_size(frame);
        let target = Rect::from_size(bounds);

        let (source_crop, destination) = if frame.is_empty() || bounds.is_empty() {
            (source, target)
        } else {
            let (fw, fh) = (source.width, source.height);
            let (bw, bh) = (target.width, target.height);
            match gravity {
                VideoGravity::AspectFill => {
                    let scale = (bw / fw).max(bh / fh);
                    let crop_w = bw / scale;
                    let crop_h = bh / scale;
                    let crop = Rect {
                        x: (fw - crop_w) / 2.0,
                        y: (fh - crop_h) / 2.0,
                        width: crop_w,
                        height: crop_h,
                    };
                    (crop, target)
                }
                VideoGravity::AspectFit => {
                    let scale = (bw / fw).min(bh / fh);
                    let dest_w = fw * scale;
                    let dest_h = fh * scale;
                    let dest = Rect {
                        x: (bw - dest_w) / 2.0,
                        y: (bh - dest_h) / 2.0,
                        width: dest_w,
                        height: dest_h,
                    };
                    (source, dest)
                }
                VideoGravity::Resize => (source, target),
            }
        };

        Self {
            bounds,
            source_crop,
            destination,
            gravity,
            mirrored,
        }
    }

    /// Frame coordinate shown at surface point `(x, y)`, or `None` if the
    /// point is outside the drawn area (letterbox bars).
    pub fn source_point(&self, x: f32, y: f32) -> Option<(f32, f32)> {
        let dest = &self.destination;
        if !dest.contains(x, y) {
            return None;
        }
        let mut u = (x - dest.x) / dest.width;
        let v = (y - dest.y) / dest.height;
        if self.mirrored {
            u = 1.0 - u;
        }
        let crop = &self.source_crop;
        Some((crop.x + u * crop.width, crop.y + v * crop.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn aspect_fill_crops_the_long_side() {
        // 4:3 frame into a 16:9 screen: full width, top and bottom cropped
        let layout = PreviewLayout::compute(
            Size::new(640, 480),
            Size::new(1920, 1080),
            VideoGravity::AspectFill,
            true,
        );

        assert_eq!(layout.destination, Rect::from_size(Size::new(1920, 1080)));
        assert_relative_eq!(layout.source_crop.x, 0.0);
        assert_relative_eq!(layout.source_crop.width, 640.0);
        assert_relative_eq!(layout.source_crop.height, 360.0);
        assert_relative_eq!(layout.source_crop.y, 60.0);
    }

    #[test]
    fn aspect_fill_preserves_aspect_ratio() {
        let bounds = Size::new(800, 1280);
        let layout = PreviewLayout::compute(Size::new(1280, 720), bounds, VideoGravity::AspectFill, false);

        let crop = layout.source_crop;
        assert_relative_eq!(crop.width / crop.height, 800.0 / 1280.0, epsilon = 1e-4);
        assert_relative_eq!(crop.height, 720.0, epsilon = 1e-3);
        assert_relative_eq!(crop.x + crop.width / 2.0, 640.0, epsilon = 1e-3);
    }

    #[test]
    fn aspect_fit_letterboxes() {
        let layout = PreviewLayout::compute(
            Size::new(640, 480),
            Size::new(1920, 1080),
            VideoGravity::AspectFit,
            false,
        );

        assert_relative_eq!(layout.destination.height, 1080.0);
        assert_relative_eq!(layout.destination.width, 1440.0);
        assert_relative_eq!(layout.destination.x, 240.0);
        assert_eq!(layout.source_point(10.0, 500.0), None);
    }

    #[test]
    fn mirrored_layout_flips_horizontally() {
        let plain = PreviewLayout::compute(Size::new(100, 100), Size::new(100, 100), VideoGravity::Resize, false);
        let mirrored = PreviewLayout::compute(Size::new(100, 100), Size::new(100, 100), VideoGravity::Resize, true);

        let (px, py) = plain.source_point(10.0, 20.0).unwrap();
        let (mx, my) = mirrored.source_point(10.0, 20.0).unwrap();
        assert_relative_eq!(px, 10.0, epsilon = 1e-3);
        assert_relative_eq!(mx, 90.0, epsilon = 1e-3);
        assert_relative_eq!(py, my);
    }

    #[test]
    fn empty_bounds_do_not_divide_by_zero() {
        let layout = PreviewLayout::compute(Size::new(640, 480), Size::new(0, 0), VideoGravity::AspectFill, true);
        assert_eq!(layout.source_point(0.0, 0.0), None);
    }
}
