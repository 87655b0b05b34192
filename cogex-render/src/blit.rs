use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Composites `src` onto `dst` with its top-left corner at `(x, y)`, clipping
/// to `dst`. Fully opaque sources are copied row by row; anything else is
/// blended source-over in premultiplied space.
pub fn blit_over(dst: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    let (w, h) = (src.width() as i32, src.height() as i32);
    let dst_x_start = x.max(0);
    let dst_y_start = y.max(0);
    let dst_x_end = (x + w).min(dst.width() as i32);
    let dst_y_end = (y + h).min(dst.height() as i32);
    if dst_x_end <= dst_x_start || dst_y_end <= dst_y_start {
        return;
    }

    let src_x_start = (dst_x_start - x) as usize;
    let src_y_start = (dst_y_start - y) as usize;
    let max_w = (dst_x_end - dst_x_start) as usize;
    let max_h = (dst_y_end - dst_y_start) as usize;
    let (dst_x_start, dst_y_start) = (dst_x_start as usize, dst_y_start as usize);

    let src_stride = src.width() as usize;
    let dst_stride = dst.width() as usize;
    let src_px = src.pixels();

    let fully_opaque = (0..max_h).all(|row| {
        let start = (src_y_start + row) * src_stride + src_x_start;
        src_px[start..start + max_w].iter().all(|p| p.alpha() == 255)
    });

    if fully_opaque {
        let src_data = src.data();
        let dst_data = dst.data_mut();
        for row in 0..max_h {
            let s = ((src_y_start + row) * src_stride + src_x_start) * 4;
            let d = ((dst_y_start + row) * dst_stride + dst_x_start) * 4;
            dst_data[d..d + max_w * 4].copy_from_slice(&src_data[s..s + max_w * 4]);
        }
        return;
    }

    let dst_px = dst.pixels_mut();
    for row in 0..max_h {
        for col in 0..max_w {
            let s = src_px[(src_y_start + row) * src_stride + src_x_start + col];
            if s.alpha() == 0 {
                continue;
            }
            let di = (dst_y_start + row) * dst_stride + dst_x_start + col;
            dst_px[di] = over(s, dst_px[di]);
        }
    }
}

fn over(src: PremultipliedColorU8, bg: PremultipliedColorU8) -> PremultipliedColorU8 {
    let inv = 255 - src.alpha() as u32;
    let mix = |s: u8, b: u8| (s as u32 + (b as u32 * inv + 127) / 255).min(255) as u8;
    let a = mix(src.alpha(), bg.alpha());
    // Channels never exceed alpha in premultiplied space.
    let r = mix(src.red(), bg.red()).min(a);
    let g = mix(src.green(), bg.green()).min(a);
    let b = mix(src.blue(), bg.blue()).min(a);
    PremultipliedColorU8::from_rgba(r, g, b, a).unwrap_or(bg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::Color;

    fn solid(w: u32, h: u32, color: Color) -> Pixmap {
        let mut pm = Pixmap::new(w, h).unwrap();
        pm.fill(color);
        pm
    }

    #[test]
    fn opaque_source_is_copied() {
        let mut dst = solid(4, 4, Color::BLACK);
        let src = solid(2, 2, Color::WHITE);
        blit_over(&mut dst, &src, 1, 1);
        assert_eq!(dst.pixel(1, 1).unwrap().red(), 255);
        assert_eq!(dst.pixel(2, 2).unwrap().red(), 255);
        assert_eq!(dst.pixel(0, 0).unwrap().red(), 0);
        assert_eq!(dst.pixel(3, 3).unwrap().red(), 0);
    }

    #[test]
    fn source_is_clipped_at_edges() {
        let mut dst = solid(4, 4, Color::BLACK);
        let src = solid(3, 3, Color::WHITE);
        blit_over(&mut dst, &src, -2, 2);
        assert_eq!(dst.pixel(0, 2).unwrap().red(), 255);
        assert_eq!(dst.pixel(0, 3).unwrap().red(), 255);
        assert_eq!(dst.pixel(1, 2).unwrap().red(), 0);
        blit_over(&mut dst, &src, 10, 10);
    }

    #[test]
    fn translucent_source_blends() {
        let mut dst = solid(1, 1, Color::BLACK);
        let src = solid(1, 1, Color::from_rgba8(255, 255, 255, 128));
        blit_over(&mut dst, &src, 0, 0);
        let p = dst.pixel(0, 0).unwrap();
        assert_eq!(p.alpha(), 255);
        assert!((120..=136).contains(&p.red()), "red = {}", p.red());
    }
}
