use crate::blit::blit_over;
use crate::images::ImageStore;
use crate::mount::Mount;
use cogex_core::{ImageRef, RenderMode};
use tiny_skia::Color;
use tracing::warn;

/// Draws animation frames into a mount. The two implementations match the
/// two render modes; prompt handling and stimulus removal are shared.
pub trait FrameRenderer {
    fn mode(&self) -> RenderMode;

    fn draw_frame(&mut self, mount: &mut Mount, images: &ImageStore, image: &ImageRef);

    fn show_prompt(&mut self, mount: &mut Mount, prompt: &str) {
        mount.set_prompt(prompt);
    }

    fn remove_stimulus(&mut self, mount: &mut Mount) {
        mount.remove_stimulus();
    }
}

pub fn renderer_for(mode: RenderMode) -> Box<dyn FrameRenderer> {
    match mode {
        RenderMode::Canvas => Box::new(CanvasRenderer::default()),
        RenderMode::Markup => Box::new(MarkupRenderer),
    }
}

/// Paints each frame's preloaded pixels into a canvas sized to the image
#[derive(Debug, Default)]
pub struct CanvasRenderer {
    missing_reported: bool,
}

impl FrameRenderer for CanvasRenderer {
    fn mode(&self) -> RenderMode {
        RenderMode::Canvas
    }

    fn draw_frame(&mut self, mount: &mut Mount, images: &ImageStore, image: &ImageRef) {
        let Some(pixmap) = images.get(image) else {
            if !self.missing_reported {
                warn!(image = %image, "frame image was not preloaded, drawing blank canvas");
                self.missing_reported = true;
            }
            let (w, h) = mount
                .canvas()
                .map_or((mount.width(), mount.height()), |c| (c.width(), c.height()));
            if let Some(canvas) = mount.canvas_mut(w, h) {
                canvas.fill(Color::TRANSPARENT);
            }
            return;
        };
        if let Some(canvas) = mount.canvas_mut(pixmap.width(), pixmap.height()) {
            canvas.fill(Color::TRANSPARENT);
            blit_over(canvas, &pixmap, 0, 0);
        }
    }
}

/// Shows each frame as an image reference in the markup
#[derive(Debug, Default)]
pub struct MarkupRenderer;

impl FrameRenderer for MarkupRenderer {
    fn mode(&self) -> RenderMode {
        RenderMode::Markup
    }

    fn draw_frame(&mut self, mount: &mut Mount, _images: &ImageStore, image: &ImageRef) {
        mount.set_image(image.clone());
    }
}
