use crate::models::frame::VideoFrame;
use crate::preview::layout::PreviewLayout;

/// Downstream consumer that puts frames on screen.
///
/// The preview surface has already decided scaling, crop and mirroring;
/// the renderer just draws `layout.source_crop` of the frame into
/// `layout.destination`, flipped if `layout.mirrored`.
pub trait FrameRenderer: Send + Sync {
    fn render(&self, frame: &VideoFrame, layout: &PreviewLayout);
}
