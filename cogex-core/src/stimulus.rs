use cogex_cache::intern_image;
use serde::{Deserialize, Serialize};

/// Anything a renderer can look up in a preloaded cache
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    fn cache_id(&self) -> usize;
}

/// Path or URL of a stimulus image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Stimulus for ImageRef {
    fn cache_id(&self) -> usize {
        intern_image(&self.0)
    }
}

/// One cell of a scene grid. `0` in the configuration means an empty cell,
/// anything else names an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CellRepr", into = "CellRepr")]
pub enum Cell {
    Empty,
    Image(ImageRef),
}

impl Cell {
    pub fn image(&self) -> Option<&ImageRef> {
        match self {
            Cell::Empty => None,
            Cell::Image(img) => Some(img),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Image(ImageRef::from(s))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CellRepr {
    Number(u64),
    Path(String),
}

impl TryFrom<CellRepr> for Cell {
    type Error = std::convert::Infallible;

    fn try_from(repr: CellRepr) -> Result<Self, Self::Error> {
        Ok(match repr {
            CellRepr::Number(0) => Cell::Empty,
            CellRepr::Number(n) => Cell::Image(ImageRef::new(n.to_string())),
            CellRepr::Path(p) => Cell::Image(ImageRef::new(p)),
        })
    }
}

impl From<Cell> for CellRepr {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Empty => CellRepr::Number(0),
            Cell::Image(img) => CellRepr::Path(img.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_cells_are_empty() {
        let row: Vec<Cell> = serde_json::from_str(r#"[0, "img/a.png", 0]"#).unwrap();
        assert_eq!(
            row,
            vec![Cell::Empty, Cell::from("img/a.png"), Cell::Empty]
        );
    }

    #[test]
    fn empty_cells_serialize_back_to_zero() {
        let json = serde_json::to_string(&vec![Cell::Empty, Cell::from("b.png")]).unwrap();
        assert_eq!(json, r#"[0,"b.png"]"#);
    }

    #[test]
    fn cache_id_is_stable_per_path() {
        let a = ImageRef::from("img/stable.png");
        assert_eq!(a.cache_id(), a.clone().cache_id());
    }
}
