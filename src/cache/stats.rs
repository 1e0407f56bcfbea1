//! Cache statistics: a full walk of the tile tree.
//!
//! The filesystem is the source of truth; nothing here is persisted or
//! counted incrementally. A walk is O(tiles), so it runs on the blocking
//! pool and never on the tile-serving path.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::key::is_tile_file;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Point-in-time view of the cache contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSnapshot {
    pub tile_count: u64,
    pub total_bytes: u64,
}

impl CacheSnapshot {
    /// Total size in MiB, rounded to two decimal places.
    pub fn size_mb(&self) -> f64 {
        (self.total_bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
    }
}

/// Walk `root` and count every `.png` file beneath it.
///
/// Unreadable directories and entries are skipped; the result is whatever
/// could be read.
pub fn scan(root: &Path) -> CacheSnapshot {
    let mut snapshot = CacheSnapshot::default();
    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "Skipping unreadable cache directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && is_tile_file(&path) {
                match entry.metadata() {
                    Ok(meta) => {
                        snapshot.tile_count += 1;
                        snapshot.total_bytes += meta.len();
                    }
                    Err(e) => debug!(path = %path.display(), error = %e, "Skipping tile"),
                }
            }
        }
    }

    snapshot
}

/// Run [`scan`] on the blocking thread pool.
pub async fn scan_in_background(root: PathBuf) -> CacheSnapshot {
    match tokio::task::spawn_blocking(move || scan(&root)).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Cache scan task failed");
            CacheSnapshot::default()
        }
    }
}
