//! Tile coordinates and response provenance.
//!
//! A [`TileCoord`] is the sole identity of a cached tile in the standard
//! slippy-map scheme: zoom level `z` and column/row `x`/`y` in `[0, 2^z)`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest zoom level served.
pub const MAX_ZOOM: u8 = 19;

/// File extension of tile images, both on the wire and on disk.
pub const TILE_EXTENSION: &str = "png";

/// Client-side errors: the request never reaches the cache or the origin.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TileError {
    #[error("{segment} is not an integer: {value:?}")]
    Malformed { segment: &'static str, value: String },

    #[error("zoom {zoom} outside [0, {max}]", max = MAX_ZOOM)]
    ZoomOutOfRange { zoom: i64 },

    #[error("tile {x}/{y} outside the {size}x{size} grid at zoom {zoom}")]
    OutOfGrid { zoom: u8, x: i64, y: i64, size: u32 },

    #[error("unsupported tile format: {0:?}")]
    UnsupportedFormat(String),
}

/// A `(zoom, x, y)` tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// Build a coordinate, checking zoom and grid bounds.
    pub fn new(zoom: i64, x: i64, y: i64) -> Result<Self, TileError> {
        if !(0..=MAX_ZOOM as i64).contains(&zoom) {
            return Err(TileError::ZoomOutOfRange { zoom });
        }
        let zoom = zoom as u8;
        let size = grid_size(zoom);
        let in_grid = |v: i64| (0..size as i64).contains(&v);
        if !in_grid(x) || !in_grid(y) {
            return Err(TileError::OutOfGrid { zoom, x, y, size });
        }
        Ok(Self {
            zoom,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Parse the three path segments of `/{zoom}/{x}/{y}.png`.
    ///
    /// The last segment must carry the `.png` suffix.
    pub fn from_path_segments(zoom: &str, x: &str, y_file: &str) -> Result<Self, TileError> {
        let y = y_file
            .strip_suffix(TILE_EXTENSION)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| TileError::UnsupportedFormat(y_file.to_string()))?;

        Self::new(
            parse_segment("zoom", zoom)?,
            parse_segment("x", x)?,
            parse_segment("y", y)?,
        )
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one axis at `zoom`.
pub fn grid_size(zoom: u8) -> u32 {
    1u32 << zoom
}

fn parse_segment(segment: &'static str, value: &str) -> Result<i64, TileError> {
    value.parse::<i64>().map_err(|_| TileError::Malformed {
        segment,
        value: value.to_string(),
    })
}

/// Which path of the serving policy produced a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Cache,
    Origin,
    Placeholder,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "cache",
            Provenance::Origin => "origin",
            Provenance::Placeholder => "placeholder",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
