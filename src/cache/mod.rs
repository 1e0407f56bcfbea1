//! Persistent tile cache.
//!
//! - [`key`]: coordinate → `{root}/{zoom}/{x}/{y}.png` mapping
//! - [`store`]: read/write of tile bytes under the cache root
//! - [`stats`]: full-tree scan for tile count and size

pub mod key;
pub mod stats;
pub mod store;

pub use stats::CacheSnapshot;
pub use store::{StoreError, TileStore};
