//! Demo-data dashboard backend.
//!
//! Serves a deterministic synthetic retail dataset (sales, inventory,
//! profit, trends) next to live crypto market and World Bank indicator
//! feeds. External calls go through a keyed TTL cache with per-provider
//! rate limiting, request coalescing, and sample-data fallback, so the
//! API stays responsive when upstreams are slow or down.

pub mod application;
pub mod config;
pub mod domain;
pub mod fetch;
pub mod infra;
