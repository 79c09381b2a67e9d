//! Cache Probe - checks that the configured cache backend is reachable
//!
//! Reads the same environment variables as [`cache_repo::Config::from_env`],
//! builds the backend, pings it and exits non-zero if anything fails.

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_repo::{CacheRepo, Config};

/// Main entry point for the cache probe.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build and connect the configured backend
/// 4. Ping it, then close it
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_repo=info,cache_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: backend={}, redis_addr={}, redis_db={}, memcache_server={}",
        config.backend, config.redis.addr, config.redis.db, config.memcache_server
    );

    let cache = config
        .build()
        .await
        .with_context(|| format!("failed to build {} backend", config.backend))?;

    let outcome = cache.ping().await;
    if let Err(err) = cache.close().await {
        error!(error = %err, "failed to close cache backend");
    }

    outcome.with_context(|| format!("{} backend did not answer ping", cache.kind()))?;
    info!(backend = cache.kind(), "cache backend is healthy");
    Ok(())
}
