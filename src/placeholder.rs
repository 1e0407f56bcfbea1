//! Fallback tile served when neither the cache nor the origin has one.
//!
//! The image is a 256×256 flat gray PNG compiled into the binary, so it is
//! available on first boot with no network and an empty cache.

use bytes::Bytes;

static PLACEHOLDER_PNG: &[u8] = include_bytes!("../assets/placeholder.png");

/// The fixed placeholder tile.
pub fn placeholder() -> Bytes {
    Bytes::from_static(PLACEHOLDER_PNG)
}
