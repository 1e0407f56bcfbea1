//! tile-cache-proxy: offline-capable map tile cache.
//!
//! Serves slippy-map raster tiles to a map viewer:
//!   disk cache (hit) → random origin mirror (miss) → gray placeholder (offline)
//!
//! Tiles fetched from the origin are written to the cache and kept forever,
//! so anything viewed once keeps working without a network.

pub mod cache;
pub mod config;
pub mod metrics;
pub mod origin;
pub mod placeholder;
pub mod server;
pub mod tile;
