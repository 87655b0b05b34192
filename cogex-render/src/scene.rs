use crate::mount::escape_attr;
use cogex_core::{Cell, ImageRef};

/// An image pinned to a pixel position inside a scene
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub image: ImageRef,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    pub fn markup(&self) -> String {
        format!(
            r#"<img src="{}" style="position: absolute; left: {}px; top: {}px; width: {}px; height: {}px;">"#,
            escape_attr(self.image.as_str()),
            self.x,
            self.y,
            self.width,
            self.height
        )
    }
}

/// Pixel layout of a grid of images. Each cell is the image size plus a
/// padding of a tenth of that size on every side.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub width: u32,
    pub height: u32,
    pub placements: Vec<Placement>,
}

impl SceneLayout {
    pub fn new(grid: &[Vec<Cell>], image_size: [u32; 2]) -> Self {
        let [w, h] = image_size;
        let (pad_x, pad_y) = (w / 10, h / 10);
        let (pitch_x, pitch_y) = (w + 2 * pad_x, h + 2 * pad_y);

        let mut placements = Vec::new();
        let mut cols = 0;
        for (row, cells) in grid.iter().enumerate() {
            cols = cols.max(cells.len() as u32);
            for (col, cell) in cells.iter().enumerate() {
                if let Some(image) = cell.image() {
                    placements.push(Placement {
                        image: image.clone(),
                        x: col as u32 * pitch_x + pad_x,
                        y: row as u32 * pitch_y + pad_y,
                        width: w,
                        height: h,
                    });
                }
            }
        }

        Self {
            width: cols * pitch_x,
            height: grid.len() as u32 * pitch_y,
            placements,
        }
    }
}
