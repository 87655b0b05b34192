use ab_glyph::{Font, FontArc, Glyph, InvalidFont, PxScale, ScaleFont, point};
use tiny_skia::{Color, Pixmap, PremultipliedColorU8};

/// Rasterises lines of text for hosts that cannot render markup themselves
#[derive(Clone)]
pub struct TextRasterizer {
    font: FontArc,
    size_px: f32,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer")
            .field("size_px", &self.size_px)
            .finish()
    }
}

impl TextRasterizer {
    pub fn from_bytes(bytes: Vec<u8>, size_px: f32) -> Result<Self, InvalidFont> {
        Ok(Self {
            font: FontArc::try_from_vec(bytes)?,
            size_px,
        })
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub fn line_height(&self) -> f32 {
        let sf = self.font.as_scaled(PxScale::from(self.size_px));
        sf.height() + sf.line_gap()
    }

    /// Renders one line into a tight, transparent pixmap
    pub fn render_line(&self, text: &str, color: Color) -> Pixmap {
        let scale = PxScale::from(self.size_px);
        let sf = self.font.as_scaled(scale);

        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in text.chars() {
            let id = self.font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, sf.ascent()),
            });
            pen_x += sf.h_advance(id);
        }

        let outlines: Vec<_> = glyphs
            .into_iter()
            .filter_map(|g| self.font.outline_glyph(g))
            .collect();

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for out in &outlines {
            let b = out.px_bounds();
            min_x = min_x.min(b.min.x);
            min_y = min_y.min(b.min.y);
            max_x = max_x.max(b.max.x);
            max_y = max_y.max(b.max.y);
        }

        if outlines.is_empty() {
            return blank();
        }

        let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
        let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
        let Some(mut pm) = Pixmap::new(w, h) else {
            return blank();
        };

        let stride = w as usize;
        let dst = pm.pixels_mut();
        let cu = color.to_color_u8();

        for out in &outlines {
            let b = out.px_bounds();
            out.draw(|x, y, cov| {
                if cov <= f32::EPSILON {
                    return;
                }
                let ix = (x as f32 + b.min.x - min_x).floor() as i32;
                let iy = (y as f32 + b.min.y - min_y).floor() as i32;
                if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                    return;
                }
                let i = iy as usize * stride + ix as usize;

                let a_lin = (cov * cu.alpha() as f32 / 255.0).clamp(0.0, 1.0);
                let sa = (a_lin * 255.0) as u8;
                let sr = ((cu.red() as f32 * a_lin) as u8).min(sa);
                let sg = ((cu.green() as f32 * a_lin) as u8).min(sa);
                let sb = ((cu.blue() as f32 * a_lin) as u8).min(sa);

                // Overlapping glyph edges keep the stronger coverage.
                let bg = dst[i];
                if sa >= bg.alpha() {
                    if let Some(px) = PremultipliedColorU8::from_rgba(sr, sg, sb, sa) {
                        dst[i] = px;
                    }
                }
            });
        }

        pm
    }
}

fn blank() -> Pixmap {
    Pixmap::new(1, 1).expect("1x1 pixmap")
}
