//! Remote tile origin.
//!
//! - [`mirrors`]: the set of interchangeable mirror hosts
//! - [`http`]: reqwest-backed fetcher with a fixed timeout
//!
//! The request handler only sees the [`TileFetcher`] trait, so tests can
//! substitute an in-process fetcher.

pub mod http;
pub mod mirrors;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::tile::TileCoord;

pub use http::HttpOriginFetcher;
pub use mirrors::MirrorSet;

/// Why an origin fetch failed. Callers treat every variant the same way.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("no origin mirrors configured")]
    NoMirrors,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Retrieves one tile image from the origin.
#[async_trait]
pub trait TileFetcher: Send + Sync {
    /// Fetch the raw image bytes for `coord`. A single attempt against a
    /// single mirror; no retries.
    async fn fetch(&self, coord: TileCoord) -> Result<Bytes, FetchError>;
}
