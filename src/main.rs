//! tile-cache-proxy: offline-capable map tile cache and proxy.
//!
//! Serves `/{zoom}/{x}/{y}.png` from a persistent on-disk cache, filling
//! misses from a random origin mirror and degrading to a placeholder tile
//! when the origin is unreachable.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use tile_cache_proxy::cache::TileStore;
use tile_cache_proxy::config::{Cli, Config};
use tile_cache_proxy::metrics::TileMetrics;
use tile_cache_proxy::origin::HttpOriginFetcher;
use tile_cache_proxy::server::tile_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "tile_cache_proxy=debug,tower_http=debug"
    } else {
        "tile_cache_proxy=info,tower_http=info"
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("tile-cache-proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    info!(
        cache_root = %config.cache.root.display(),
        limit = ?config.cache.limit,
        mirrors = config.origin.mirrors.len(),
        timeout_secs = config.origin.timeout_secs,
        "Configuration loaded"
    );

    // The only fatal startup condition: no usable cache root.
    let store = TileStore::open(&config.cache.root, config.cache.limit)
        .await
        .with_context(|| format!("cannot create cache root {}", config.cache.root.display()))?;

    let fetcher = HttpOriginFetcher::new(&config.origin)?;
    let metrics = TileMetrics::new()?;

    let state = Arc::new(AppState::new(Arc::new(store), Arc::new(fetcher), metrics));

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen;
    info!(addr = %listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
