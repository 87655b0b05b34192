use cogex_cache::{get_image, image_count, lookup_image};
use cogex_core::{ImageRef, Stimulus};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tiny_skia::{ColorU8, Pixmap};
use tracing::debug;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("image {0} has zero size")]
    Empty(PathBuf),
}

/// Decoded stimulus images, keyed by interned reference.
///
/// Preloading up front guarantees that drawing a frame never touches the disk.
#[derive(Debug, Default)]
pub struct ImageStore {
    base_dir: Option<PathBuf>,
    pixmaps: HashMap<usize, Arc<Pixmap>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative references are resolved against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
            pixmaps: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.pixmaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixmaps.is_empty()
    }

    pub fn contains(&self, image: &ImageRef) -> bool {
        self.get(image).is_some()
    }

    pub fn get(&self, image: &ImageRef) -> Option<Arc<Pixmap>> {
        let id = lookup_image(image.as_str())?;
        self.pixmaps.get(&id).cloned()
    }

    /// References of every loaded image, sorted
    pub fn references(&self) -> Vec<String> {
        let mut refs: Vec<String> = self
            .pixmaps
            .keys()
            .filter_map(|&id| get_image(id))
            .map(|atom| atom.to_string())
            .collect();
        refs.sort();
        refs
    }

    pub fn insert(&mut self, image: &ImageRef, pixmap: Pixmap) {
        self.pixmaps.insert(image.cache_id(), Arc::new(pixmap));
    }

    /// Decodes every image not already loaded. Returns how many were decoded.
    pub fn preload<'a, I>(&mut self, images: I) -> Result<usize, ImageError>
    where
        I: IntoIterator<Item = &'a ImageRef>,
    {
        let mut loaded = 0;
        for image in images {
            if self.contains(image) {
                continue;
            }
            let pixmap = decode(&self.resolve(image))?;
            debug!(image = %image, width = pixmap.width(), height = pixmap.height(), "preloaded");
            self.insert(image, pixmap);
            loaded += 1;
        }
        debug!(loaded, total = self.len(), interned = image_count(), "preload finished");
        Ok(loaded)
    }

    fn resolve(&self, image: &ImageRef) -> PathBuf {
        let path = Path::new(image.as_str());
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

fn decode(path: &Path) -> Result<Pixmap, ImageError> {
    let rgba = image::open(path)
        .map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();
    let (w, h) = rgba.dimensions();
    let mut pixmap = Pixmap::new(w, h).ok_or_else(|| ImageError::Empty(path.to_path_buf()))?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_pixmaps_are_found_by_reference() {
        let mut store = ImageStore::new();
        let img = ImageRef::from("store_test/inserted.png");
        assert!(!store.contains(&img));
        store.insert(&img, Pixmap::new(4, 3).unwrap());
        assert_eq!(store.get(&img).unwrap().width(), 4);
        assert_eq!(store.len(), 1);
        assert_eq!(store.references(), vec!["store_test/inserted.png".to_string()]);
    }

    #[test]
    fn pixmaps_are_keyed_by_cache_id() {
        let mut store = ImageStore::new();
        let img = ImageRef::from("store_test/keyed.png");
        store.insert(&img, Pixmap::new(2, 2).unwrap());
        assert!(store.pixmaps.contains_key(&img.cache_id()));
        assert_eq!(lookup_image(img.as_str()), Some(img.cache_id()));
        // Same reference, same slot.
        store.insert(&ImageRef::from("store_test/keyed.png"), Pixmap::new(5, 5).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&img).unwrap().width(), 5);
    }

    #[test]
    fn preload_decodes_files_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut png = image::RgbaImage::new(3, 2);
        png.put_pixel(0, 0, image::Rgba([255, 0, 0, 128]));
        png.save(dir.path().join("red.png")).unwrap();

        let mut store = ImageStore::with_base_dir(dir.path());
        let img = ImageRef::from("red.png");
        assert_eq!(store.preload([&img]).unwrap(), 1);
        assert_eq!(store.preload([&img]).unwrap(), 0);

        let pm = store.get(&img).unwrap();
        assert_eq!((pm.width(), pm.height()), (3, 2));
        let p = pm.pixel(0, 0).unwrap();
        assert_eq!(p.alpha(), 128);
        assert!(p.red() <= 128);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut store = ImageStore::with_base_dir("/nonexistent/cogex");
        let err = store.preload([&ImageRef::from("nope.png")]).unwrap_err();
        assert!(matches!(err, ImageError::Decode { .. }));
    }
}
