//! Persistent tile store.
//!
//! Tiles live at `{root}/{zoom}/{x}/{y}.png` and are immutable once written:
//! the store exposes no update or delete. Writes go through a uniquely named
//! temp file and a rename, so concurrent writers of the same tile never
//! expose a partial image; the last rename wins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::key::tile_path;
use crate::cache::stats::scan_in_background;
use crate::config::CacheLimit;
use crate::tile::TileCoord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache quota reached: {used} of {limit} bytes used")]
    QuotaExceeded { used: u64, limit: u64 },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Handle to the on-disk tile tree. Share it behind an `Arc`.
#[derive(Debug)]
pub struct TileStore {
    /// Canonical cache root.
    root: PathBuf,

    limit: CacheLimit,

    /// Bytes on disk as of startup plus every write since, reserved before
    /// each write. Rewrites subtract the tile they replace; two rewrites
    /// racing on the same missing tile can still both count it.
    used_bytes: AtomicU64,
}

impl TileStore {
    /// Open (and create if needed) the cache tree rooted at `root`.
    ///
    /// With a byte quota the existing tree is scanned once to seed usage.
    pub async fn open(root: impl Into<PathBuf>, limit: CacheLimit) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;
        let root = fs::canonicalize(&root)
            .await
            .map_err(|e| StoreError::io(&root, e))?;

        let used = match limit {
            CacheLimit::Unbounded => 0,
            CacheLimit::MaxBytes { .. } => scan_in_background(root.clone()).await.total_bytes,
        };

        info!(root = %root.display(), ?limit, used_bytes = used, "Opened tile store");

        Ok(Self {
            root,
            limit,
            used_bytes: AtomicU64::new(used),
        })
    }

    /// Canonical cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `coord` lives (or would live) on disk.
    pub fn path_for(&self, coord: TileCoord) -> PathBuf {
        tile_path(&self.root, coord)
    }

    /// Tracked usage in bytes (see the field docs for accuracy).
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Acquire)
    }

    /// Read a cached tile. `Ok(None)` is an ordinary miss.
    pub async fn get(&self, coord: TileCoord) -> Result<Option<Bytes>, StoreError> {
        let path = self.path_for(coord);
        match fs::read(&path).await {
            Ok(data) => {
                debug!(tile = %coord, size = data.len(), "Cache hit");
                Ok(Some(Bytes::from(data)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(tile = %coord, "Cache miss");
                Ok(None)
            }
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Persist a tile, creating parent directories as needed.
    ///
    /// The tile's size is reserved against the quota before any I/O, so
    /// concurrent writers cannot overshoot it together.
    pub async fn put(&self, coord: TileCoord, data: &[u8]) -> Result<PathBuf, StoreError> {
        let len = data.len() as u64;
        self.reserve(len)?;

        match self.write_tile(coord, data).await {
            Ok((path, replaced)) => {
                // a rewrite of an existing tile only adds the difference
                self.release(replaced);
                debug!(tile = %coord, path = %path.display(), size = len, "Cached tile");
                Ok(path)
            }
            Err(e) => {
                self.release(len);
                Err(e)
            }
        }
    }

    /// Write through a temp file and rename. Returns the final path and the
    /// size of the tile it replaced, if any.
    async fn write_tile(&self, coord: TileCoord, data: &[u8]) -> Result<(PathBuf, u64), StoreError> {
        let path = self.path_for(coord);
        if let Some(parent) = path.parent() {
            // create_dir_all tolerates directories created concurrently
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&tmp, e));
        }

        let replaced = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        };
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::io(&path, e));
        }

        Ok((path, replaced))
    }

    /// Account for `len` new bytes, failing if that would pass the quota.
    fn reserve(&self, len: u64) -> Result<(), StoreError> {
        match self.limit {
            CacheLimit::Unbounded => {
                self.used_bytes.fetch_add(len, Ordering::AcqRel);
                Ok(())
            }
            CacheLimit::MaxBytes { bytes: limit } => self
                .used_bytes
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                    used.checked_add(len).filter(|total| *total <= limit)
                })
                .map(|_| ())
                .map_err(|used| StoreError::QuotaExceeded { used, limit }),
        }
    }

    fn release(&self, len: u64) {
        if len == 0 {
            return;
        }
        let _ = self
            .used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(len))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COORD: TileCoord = TileCoord { zoom: 3, x: 1, y: 2 };

    #[tokio::test]
    async fn test_put_and_get_tile() {
        let tmp = TempDir::new().unwrap();
        let store = TileStore::open(tmp.path().join("tiles"), CacheLimit::Unbounded)
            .await
            .unwrap();

        assert!(store.get(COORD).await.unwrap().is_none());

        let data = vec![42u8; 4096];
        let path = store.put(COORD, &data).await.unwrap();
        assert!(path.ends_with("3/1/2.png"));
        assert_eq!(std::fs::read(&path).unwrap(), data);

        let cached = store.get(COORD).await.unwrap().unwrap();
        assert_eq!(cached.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_open_creates_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("a").join("b");
        let store = TileStore::open(&root, CacheLimit::Unbounded).await.unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), std::fs::canonicalize(&root).unwrap());
    }

    #[tokio::test]
    async fn test_open_fails_when_root_is_a_file() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("file");
        std::fs::write(&root, b"x").unwrap();
        let result = TileStore::open(&root, CacheLimit::Unbounded).await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
    }

    #[tokio::test]
    async fn test_put_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = TileStore::open(tmp.path(), CacheLimit::Unbounded).await.unwrap();
        store.put(COORD, b"one").await.unwrap();
        store.put(COORD, b"two").await.unwrap();

        let dir = store.path_for(COORD).parent().unwrap().to_path_buf();
        let names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("2.png")]);
        assert_eq!(store.get(COORD).await.unwrap().unwrap().as_ref(), b"two");
    }

    #[tokio::test]
    async fn test_quota_blocks_writes() {
        let tmp = TempDir::new().unwrap();
        let store = TileStore::open(tmp.path(), CacheLimit::MaxBytes { bytes: 100 })
            .await
            .unwrap();

        store.put(COORD, &[0u8; 60]).await.unwrap();
        assert_eq!(store.used_bytes(), 60);

        let other = TileCoord { zoom: 3, x: 2, y: 2 };
        let result = store.put(other, &[0u8; 60]).await;
        assert!(matches!(
            result,
            Err(StoreError::QuotaExceeded { used: 60, limit: 100 })
        ));
        assert!(store.get(other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_quota_seeded_from_existing_tree() {
        let tmp = TempDir::new().unwrap();
        {
            let store = TileStore::open(tmp.path(), CacheLimit::Unbounded).await.unwrap();
            store.put(COORD, &[0u8; 80]).await.unwrap();
        }

        let store = TileStore::open(tmp.path(), CacheLimit::MaxBytes { bytes: 100 })
            .await
            .unwrap();
        assert_eq!(store.used_bytes(), 80);
        let other = TileCoord { zoom: 3, x: 0, y: 0 };
        assert!(store.put(other, &[0u8; 30]).await.is_err());
    }

    #[tokio::test]
    async fn test_quota_holds_under_concurrent_puts() {
        let tmp = TempDir::new().unwrap();
        let store = std::sync::Arc::new(
            TileStore::open(tmp.path(), CacheLimit::MaxBytes { bytes: 100 })
                .await
                .unwrap(),
        );

        let writes = (0..20u32).map(|x| {
            let store = store.clone();
            tokio::spawn(async move { store.put(TileCoord { zoom: 5, x, y: 0 }, &[1u8; 60]).await })
        });
        let results = futures::future::join_all(writes).await;

        let accepted = results.iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(accepted, 1);
        assert_eq!(store.used_bytes(), 60);
        assert_eq!(crate::cache::stats::scan(store.root()).total_bytes, 60);
    }

    #[tokio::test]
    async fn test_rewrite_counts_tile_once() {
        let tmp = TempDir::new().unwrap();
        let store = TileStore::open(tmp.path(), CacheLimit::MaxBytes { bytes: 100 })
            .await
            .unwrap();

        store.put(COORD, &[0u8; 60]).await.unwrap();
        store.put(COORD, &[0u8; 30]).await.unwrap();
        assert_eq!(store.used_bytes(), 30);
    }

    #[tokio::test]
    async fn test_failed_write_releases_reservation() {
        let tmp = TempDir::new().unwrap();
        let store = TileStore::open(tmp.path(), CacheLimit::MaxBytes { bytes: 100 })
            .await
            .unwrap();

        // a file where the zoom directory should be
        std::fs::write(store.root().join("3"), b"x").unwrap();
        let result = store.put(COORD, &[0u8; 60]).await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.used_bytes(), 0);

        let other = TileCoord { zoom: 4, x: 0, y: 0 };
        store.put(other, &[0u8; 90]).await.unwrap();
        assert_eq!(store.used_bytes(), 90);
    }
}
