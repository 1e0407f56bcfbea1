//! HTTP origin fetcher.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{FetchError, MirrorSet, TileFetcher};
use crate::config::OriginConfig;
use crate::tile::TileCoord;

/// Fetches tiles from a randomly chosen mirror over HTTP(S).
pub struct HttpOriginFetcher {
    client: reqwest::Client,
    mirrors: MirrorSet,
}

impl HttpOriginFetcher {
    /// Build a fetcher with the configured mirrors, timeout and User-Agent.
    pub fn new(config: &OriginConfig) -> Result<Self, FetchError> {
        let mirrors = MirrorSet::new(&config.mirrors);
        if mirrors.is_empty() {
            return Err(FetchError::NoMirrors);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client, mirrors })
    }

    pub fn mirrors(&self) -> &MirrorSet {
        &self.mirrors
    }
}

#[async_trait]
impl TileFetcher for HttpOriginFetcher {
    async fn fetch(&self, coord: TileCoord) -> Result<Bytes, FetchError> {
        let base = self.mirrors.choose().ok_or(FetchError::NoMirrors)?;
        let url = MirrorSet::tile_url(base, coord);

        let classify = |e: reqwest::Error, url: &str| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    source: e,
                }
            }
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await.map_err(|e| classify(e, &url))?;
        debug!(tile = %coord, url = %url, size = data.len(), "Fetched tile from origin");
        Ok(data)
    }
}
