//! duracache demo binary
//!
//! Opens a cache on a local path and walks through the basic operations:
//! plain puts, TTL expiry, overwrite, delete and a stats dump.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duracache::{Cache, CacheConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "duracache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./duracache-demo".to_string());
    let config = CacheConfig::from_env();
    info!(
        path = %path,
        max_memory_mb = config.max_memory_mb,
        default_ttl_secs = config.default_ttl_secs,
        cleanup_interval_secs = config.cleanup_interval_secs,
        engine = ?config.engine,
        "configuration loaded"
    );

    let cache = Cache::open(&path, config).context("failed to open cache")?;

    // Plain put and get
    cache.put("greeting", b"hello world", None)?;
    let value = cache.get("greeting")?;
    info!(value = ?value.map(String::from_utf8), "read back greeting");

    // Overwrite: the second value wins
    cache.put("greeting", b"hello again", None)?;
    assert_eq!(cache.get("greeting")?, Some(b"hello again".to_vec()));

    // A short-lived key expires after its TTL
    cache.put("fleeting", b"gone in a second", Some(1))?;
    info!(present = cache.get("fleeting")?.is_some(), "fleeting key before expiry");
    tokio::time::sleep(Duration::from_secs(2)).await;
    info!(present = cache.get("fleeting")?.is_some(), "fleeting key after expiry");

    // Explicit delete
    cache.delete("greeting")?;
    assert_eq!(cache.get("greeting")?, None);

    info!(
        memory_usage_bytes = cache.memory_usage(),
        stats = %serde_json::to_string(&cache.stats())?,
        "final snapshot"
    );

    cache.close().await.context("failed to close cache")?;
    Ok(())
}
