//! Display side of the stimulus plugins.
//!
//! A [`Mount`] is the display element a trial owns while it runs. Plugins write
//! into it through a [`FrameRenderer`] picked by the trial's render mode; hosts
//! read it back as markup or composite it onto a pixel buffer.

pub mod blit;
pub mod frames;
pub mod images;
pub mod mount;
pub mod scene;
pub mod text;

pub use blit::blit_over;
pub use frames::{CanvasRenderer, FrameRenderer, MarkupRenderer, renderer_for};
pub use images::{ImageError, ImageStore};
pub use mount::{Mount, StimulusView};
pub use scene::{Placement, SceneLayout};
pub use text::TextRasterizer;
