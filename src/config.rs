//! Runtime configuration for tile-cache-proxy.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every section has defaults, so a partial file (or no file) is valid.

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "tile-cache-proxy", about = "Offline-capable map tile cache and proxy")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// HTTP listen address (overrides `server.listen`).
    #[arg(long)]
    pub listen: Option<String>,

    /// Tile cache directory (overrides `cache.root`).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("origin.mirrors must list at least one mirror")]
    NoMirrors,

    #[error("origin.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("cache.limit max_bytes must be greater than zero")]
    ZeroQuota,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,

    /// On-disk tile cache.
    pub cache: CacheConfig,

    /// Remote tile origin.
    pub origin: OriginConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address (e.g. "0.0.0.0:8080").
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How far the cache is allowed to grow.
///
/// Tiles are never evicted. A byte quota only stops new tiles from being
/// written once it is reached; they are still served from the origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheLimit {
    /// Keep every tile forever.
    #[default]
    Unbounded,
    /// Stop caching once the tree holds this many bytes.
    MaxBytes { bytes: u64 },
}

/// Tile cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the `{zoom}/{x}/{y}.png` tree.
    pub root: PathBuf,

    /// Growth bound.
    pub limit: CacheLimit,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("tile_cache"),
            limit: CacheLimit::Unbounded,
        }
    }
}

/// Origin mirror settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Interchangeable mirrors; one is picked at random per cache miss.
    /// Bare hostnames are treated as `https://`.
    pub mirrors: Vec<String>,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent sent to the origin.
    pub user_agent: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            mirrors: ["a", "b", "c"]
                .iter()
                .map(|m| format!("https://{m}.tile.openstreetmap.org"))
                .collect(),
            timeout_secs: 10,
            user_agent: format!("tile-cache-proxy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&data)?;
            Ok(config)
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    /// Apply command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = &cli.listen {
            self.server.listen = listen.clone();
        }
        if let Some(root) = &cli.cache_dir {
            self.cache.root = root.clone();
        }
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.origin.mirrors.iter().all(|m| m.trim().is_empty()) {
            return Err(ConfigError::NoMirrors);
        }
        if self.origin.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.cache.limit == (CacheLimit::MaxBytes { bytes: 0 }) {
            return Err(ConfigError::ZeroQuota);
        }
        Ok(())
    }
}
