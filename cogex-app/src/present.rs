//! Composites a [`Mount`] onto the window's pixel buffer.
//!
//! The stimulus slot, a scene grid and the visible text of the prompt and
//! body are stacked vertically and centred, in that order.

use cogex_render::{ImageStore, Mount, StimulusView, TextRasterizer, blit_over};
use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};
use tracing::warn;

const LINE_SPACING: u32 = 8;

pub struct Presenter {
    canvas: Pixmap,
    text: Option<TextRasterizer>,
    background: Color,
    foreground: Color,
    drawn: Option<u64>,
    text_warned: bool,
}

impl Presenter {
    pub fn new(width: u32, height: u32, text: Option<TextRasterizer>) -> Option<Self> {
        Some(Self {
            canvas: Pixmap::new(width.max(1), height.max(1))?,
            text,
            background: Color::from_rgba8(128, 128, 128, 255),
            foreground: Color::BLACK,
            drawn: None,
            text_warned: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(canvas) = Pixmap::new(width.max(1), height.max(1)) {
            self.canvas = canvas;
            self.drawn = None;
        }
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Whether the mount changed since the last [`compose`](Self::compose)
    pub fn is_stale(&self, mount: &Mount) -> bool {
        self.drawn != Some(mount.revision())
    }

    pub fn compose(&mut self, mount: &Mount, images: &ImageStore) {
        self.canvas.fill(self.background);

        let stimulus = match mount.stimulus() {
            Some(StimulusView::Canvas(pm)) => Some(pm.clone()),
            Some(StimulusView::Image(image)) => images.get(image).map(|pm| (*pm).clone()),
            None => None,
        };
        let scene = mount.scene_size();
        let lines = self.text_lines(mount);

        let mut total = 0;
        total += stimulus.as_ref().map_or(0, |pm| pm.height() + LINE_SPACING);
        total += scene.map_or(0, |(_, h)| h + LINE_SPACING);
        total += lines.iter().map(|l| l.height() + LINE_SPACING).sum::<u32>();
        let mut y = (self.canvas.height() as i32 - total as i32) / 2;

        if let Some(pm) = &stimulus {
            let x = self.centred(pm.width());
            blit_over(&mut self.canvas, pm, x, y);
            y += (pm.height() + LINE_SPACING) as i32;
        }
        if let Some((w, h)) = scene {
            let x0 = self.centred(w);
            for p in mount.placements() {
                let Some(image) = images.get(&p.image) else {
                    continue;
                };
                let sx = p.width as f32 / image.width() as f32;
                let sy = p.height as f32 / image.height() as f32;
                let transform = Transform::from_scale(sx, sy)
                    .post_translate((x0 + p.x as i32) as f32, (y + p.y as i32) as f32);
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                self.canvas
                    .draw_pixmap(0, 0, Pixmap::as_ref(&image), &paint, transform, None);
            }
            y += (h + LINE_SPACING) as i32;
        }
        for line in &lines {
            let x = self.centred(line.width());
            blit_over(&mut self.canvas, line, x, y);
            y += (line.height() + LINE_SPACING) as i32;
        }

        self.drawn = Some(mount.revision());
    }

    /// Copies the composed image into an RGBA8 frame of the same size
    pub fn copy_to(&self, frame: &mut [u8]) {
        let data = self.canvas.data();
        if frame.len() == data.len() {
            frame.copy_from_slice(data);
        }
    }

    fn centred(&self, width: u32) -> i32 {
        (self.canvas.width() as i32 - width as i32) / 2
    }

    fn text_lines(&mut self, mount: &Mount) -> Vec<Pixmap> {
        let content = mount.text_content();
        if content.is_empty() {
            return Vec::new();
        }
        let Some(text) = &self.text else {
            if !self.text_warned {
                warn!("no font loaded, prompt and feedback text will not be drawn");
                self.text_warned = true;
            }
            return Vec::new();
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| text.render_line(l.trim(), self.foreground))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogex_core::{Cell, ImageRef};
    use cogex_render::SceneLayout;

    fn solid(w: u32, h: u32, color: Color) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(color);
        pm
    }

    fn pixel(pm: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let c = pm.pixel(x, y).unwrap();
        [c.red(), c.green(), c.blue(), c.alpha()]
    }

    #[test]
    fn canvas_stimulus_is_centred() {
        let mut mount = Mount::new(100, 100);
        mount
            .canvas_mut(20, 20)
            .unwrap()
            .fill(Color::from_rgba8(255, 0, 0, 255));
        let mut presenter = Presenter::new(100, 100, None).unwrap();
        assert!(presenter.is_stale(&mount));
        presenter.compose(&mount, &ImageStore::new());
        assert!(!presenter.is_stale(&mount));

        // 20px stimulus plus spacing, centred vertically
        assert_eq!(pixel(presenter.canvas(), 50, 40), [255, 0, 0, 255]);
        assert_eq!(pixel(presenter.canvas(), 5, 5), [128, 128, 128, 255]);
    }

    #[test]
    fn scene_images_are_scaled_into_their_cells() {
        let grid = vec![vec![Cell::from("g.png"), Cell::Empty]];
        let layout = SceneLayout::new(&grid, [40, 40]);
        let mut mount = Mount::new(200, 200);
        mount.set_scene(layout.width, layout.height, layout.placements);

        let mut images = ImageStore::new();
        images.insert(
            &ImageRef::from("g.png"),
            solid(4, 4, Color::from_rgba8(0, 255, 0, 255)),
        );
        let mut presenter = Presenter::new(200, 200, None).unwrap();
        presenter.compose(&mount, &images);

        // Scene is 96x48; its first cell starts 4px in from the scene origin.
        let (x0, y0) = ((200 - 96) / 2 + 4, (200 - 48 - 8) / 2 + 4);
        assert_eq!(pixel(presenter.canvas(), x0 + 20, y0 + 20), [0, 255, 0, 255]);
        assert_eq!(pixel(presenter.canvas(), x0 + 68, y0 + 20), [128, 128, 128, 255]);
    }
}
