//! Interchangeable origin mirrors.

use rand::seq::SliceRandom;

use crate::tile::{TileCoord, TILE_EXTENSION};

/// Mirrors believed to serve identical content for a given coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSet {
    /// Base URLs with scheme and without a trailing slash.
    bases: Vec<String>,
}

impl MirrorSet {
    /// Normalise the configured mirrors. Bare hostnames get `https://`,
    /// blank entries are dropped.
    pub fn new<I, S>(mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let bases = mirrors
            .into_iter()
            .filter_map(|m| {
                let m = m.as_ref().trim().trim_end_matches('/');
                if m.is_empty() {
                    None
                } else if m.contains("://") {
                    Some(m.to_string())
                } else {
                    Some(format!("https://{m}"))
                }
            })
            .collect();
        Self { bases }
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Pick a mirror uniformly at random. No affinity between calls.
    pub fn choose(&self) -> Option<&str> {
        self.bases
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// `{base}/{z}/{x}/{y}.png`
    pub fn tile_url(base: &str, coord: TileCoord) -> String {
        format!(
            "{base}/{}/{}/{}.{TILE_EXTENSION}",
            coord.zoom, coord.x, coord.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_normalisation() {
        let set = MirrorSet::new([
            "a.tile.example.org",
            "http://127.0.0.1:8080/",
            "  ",
            "https://c.tile.example.org",
        ]);
        assert_eq!(
            set.bases(),
            &[
                "https://a.tile.example.org".to_string(),
                "http://127.0.0.1:8080".to_string(),
                "https://c.tile.example.org".to_string(),
            ]
        );
    }

    #[test]
    fn test_choose_empty() {
        let set = MirrorSet::new(Vec::<String>::new());
        assert!(set.is_empty());
        assert!(set.choose().is_none());
    }

    #[test]
    fn test_choose_spreads_across_mirrors() {
        let set = MirrorSet::new(["a.example", "b.example", "c.example"]);
        let seen: HashSet<&str> = (0..500).filter_map(|_| set.choose()).collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_tile_url() {
        let coord = TileCoord { zoom: 5, x: 17, y: 11 };
        assert_eq!(
            MirrorSet::tile_url("https://a.example", coord),
            "https://a.example/5/17/11.png"
        );
    }
}
