//! Prometheus counters for the tile path.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::tile::Provenance;

/// Counters exported at `/metrics`. Cloning shares the underlying counters.
#[derive(Clone)]
pub struct TileMetrics {
    registry: Registry,
    tiles_served: IntCounterVec,
    origin_failures: IntCounter,
    cache_write_failures: IntCounter,
}

impl TileMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let tiles_served = IntCounterVec::new(
            Opts::new("tiles_served_total", "Tiles served, by provenance"),
            &["source"],
        )?;
        let origin_failures = IntCounter::new(
            "origin_fetch_failures_total",
            "Origin fetches that fell back to the placeholder",
        )?;
        let cache_write_failures = IntCounter::new(
            "cache_write_failures_total",
            "Fetched tiles that could not be written to the cache",
        )?;

        registry.register(Box::new(tiles_served.clone()))?;
        registry.register(Box::new(origin_failures.clone()))?;
        registry.register(Box::new(cache_write_failures.clone()))?;

        Ok(Self {
            registry,
            tiles_served,
            origin_failures,
            cache_write_failures,
        })
    }

    pub fn record_served(&self, provenance: Provenance) {
        self.tiles_served
            .with_label_values(&[provenance.as_str()])
            .inc();
    }

    pub fn record_origin_failure(&self) {
        self.origin_failures.inc();
    }

    pub fn record_cache_write_failure(&self) {
        self.cache_write_failures.inc();
    }

    pub fn served(&self, provenance: Provenance) -> u64 {
        self.tiles_served
            .with_label_values(&[provenance.as_str()])
            .get()
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
