//! Maps tile coordinates onto the cache tree.

use std::path::{Path, PathBuf};

use crate::tile::{TileCoord, TILE_EXTENSION};

/// Path of a tile under `root`: `{root}/{zoom}/{x}/{y}.png`.
///
/// The layout is shared with the stats scanner and with any external
/// backup tooling, so it must not change.
pub fn tile_path(root: &Path, coord: TileCoord) -> PathBuf {
    root.join(coord.zoom.to_string())
        .join(coord.x.to_string())
        .join(format!("{}.{TILE_EXTENSION}", coord.y))
}

/// Whether `path` names a tile image (as opposed to a temp file or stray).
pub fn is_tile_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_path_layout() {
        let coord = TileCoord { zoom: 12, x: 2200, y: 1343 };
        let path = tile_path(Path::new("/srv/tiles"), coord);
        assert_eq!(path, PathBuf::from("/srv/tiles/12/2200/1343.png"));
    }

    #[test]
    fn test_tile_path_is_deterministic() {
        let coord = TileCoord { zoom: 0, x: 0, y: 0 };
        let root = Path::new("cache");
        assert_eq!(tile_path(root, coord), tile_path(root, coord));
        assert!(is_tile_file(&tile_path(root, coord)));
    }

    #[test]
    fn test_is_tile_file() {
        assert!(is_tile_file(Path::new("1/2/3.png")));
        assert!(!is_tile_file(Path::new("1/2/3.a1b2.tmp")));
        assert!(!is_tile_file(Path::new("1/2/png")));
    }
}
