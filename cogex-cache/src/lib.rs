//! Process-wide interning of stimulus image references.
//!
//! Plugins and renderers refer to images by path; interning turns every
//! distinct path into a small stable id so preloaded pixmaps can be kept in a
//! flat table instead of a string-keyed map.

use lazy_static::lazy_static;
use std::sync::RwLock;
pub use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref IMAGE_INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Intern an image reference and return its id
pub fn intern_image(path: &str) -> usize {
    let atom = Atom::from(path);
    if let Some(idx) = lookup_atom(&atom) {
        return idx;
    }
    let mut v = IMAGE_INTERNER.write().unwrap_or_else(|e| e.into_inner());
    // Another writer may have pushed it between the read and write locks.
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

/// Id of an already interned reference, without interning it
pub fn lookup_image(path: &str) -> Option<usize> {
    lookup_atom(&Atom::from(path))
}

fn lookup_atom(atom: &Atom) -> Option<usize> {
    IMAGE_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .position(|a| a == atom)
}

/// Current count of unique image references
pub fn image_count() -> usize {
    IMAGE_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .len()
}

pub fn get_image(id: usize) -> Option<Atom> {
    IMAGE_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(id)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_interns_to_same_id() {
        let a = intern_image("img/cache_test_a.png");
        let b = intern_image("img/cache_test_a.png");
        assert_eq!(a, b);
        assert_eq!(get_image(a).as_deref(), Some("img/cache_test_a.png"));
    }

    #[test]
    fn distinct_paths_get_distinct_ids() {
        let a = intern_image("img/cache_test_b.png");
        let b = intern_image("img/cache_test_c.png");
        assert_ne!(a, b);
        assert!(image_count() >= 2);
    }

    #[test]
    fn lookup_does_not_intern() {
        assert_eq!(lookup_image("img/never_interned.png"), None);
        let id = intern_image("img/cache_test_d.png");
        assert_eq!(lookup_image("img/cache_test_d.png"), Some(id));
    }
}
