//! HTTP server.
//!
//! - [`tile_api`]: tile serving policy, statistics and route handlers

pub mod tile_api;
