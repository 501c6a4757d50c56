//! Integration tests for the cache public API
//!
//! Exercises open/put/get/delete/close end to end against real embedded
//! engines, including TTL expiry, the cleanup daemon and restart recovery.

use std::time::Duration;

use duracache::{Cache, CacheConfig, EngineKind};

fn test_config() -> CacheConfig {
    CacheConfig {
        max_memory_mb: 0,
        default_ttl_secs: 300,
        cleanup_interval_secs: 0,
        engine: EngineKind::Sled,
        recover: false,
    }
}

fn open_cache(config: CacheConfig) -> (Cache, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cache = Cache::open(dir.path().join("store"), config).unwrap();
    (cache, dir)
}

#[test]
fn get_before_any_put_is_a_miss() {
    let (cache, _dir) = open_cache(test_config());
    assert_eq!(cache.get("never_put").unwrap(), None);
}

#[test]
fn put_then_get_returns_value_unmodified() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("plain_key", b"plain_value", None).unwrap();

    assert_eq!(
        cache.get("plain_key").unwrap(),
        Some(b"plain_value".to_vec())
    );
}

#[test]
fn key_expires_after_its_ttl() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("ttl_key", b"ttl_value", Some(1)).unwrap();

    std::thread::sleep(Duration::from_millis(2100));

    assert_eq!(cache.get("ttl_key").unwrap(), None);
}

#[test]
fn huge_ttl_keeps_key_alive() {
    let (cache, _dir) = open_cache(test_config());

    // The expiration saturates instead of wrapping into the past.
    cache.put("immortal", b"value", Some(u64::MAX)).unwrap();

    assert_eq!(cache.get("immortal").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn key_is_readable_within_its_ttl_window() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("windowed", b"still here", Some(5)).unwrap();

    assert_eq!(cache.get("windowed").unwrap(), Some(b"still here".to_vec()));
}

#[test]
fn overwrite_returns_latest_value() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("overwrite_key", b"value1", None).unwrap();
    cache.put("overwrite_key", b"value2", None).unwrap();

    assert_eq!(
        cache.get("overwrite_key").unwrap(),
        Some(b"value2".to_vec())
    );
}

#[test]
fn delete_of_unknown_key_succeeds() {
    let (cache, _dir) = open_cache(test_config());
    cache.delete("never_inserted").unwrap();
}

#[test]
fn deleted_key_is_a_miss() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("doomed", b"value", None).unwrap();
    cache.delete("doomed").unwrap();

    assert_eq!(cache.get("doomed").unwrap(), None);
}

#[test]
fn later_put_ttl_governs_expiry() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("extended", b"value", Some(1)).unwrap();
    cache.put("extended", b"value", Some(3)).unwrap();

    // 2s in: past the first TTL but inside the second
    std::thread::sleep(Duration::from_secs(2));
    assert_eq!(cache.get("extended").unwrap(), Some(b"value".to_vec()));

    // 4s in: past the second TTL as well
    std::thread::sleep(Duration::from_secs(2));
    assert_eq!(cache.get("extended").unwrap(), None);
}

#[tokio::test]
async fn daemon_removes_expired_keys_without_foreground_gets() {
    let mut config = test_config();
    config.cleanup_interval_secs = 1;
    let (cache, _dir) = open_cache(config);

    cache.put("k1", b"v1", Some(1)).unwrap();
    cache.put("k2", b"v2", Some(3)).unwrap();

    tokio::time::sleep(Duration::from_secs(3)).await;
    // The daemon reclaimed k1 on its own; no get has run yet.
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("k1").unwrap(), None);
    assert_eq!(cache.get("k2").unwrap(), Some(b"v2".to_vec()));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.get("k2").unwrap(), None);
    assert!(cache.stats().expirations >= 2);

    cache.close().await.unwrap();
}

#[test]
fn empty_value_round_trips_as_a_hit() {
    let (cache, _dir) = open_cache(test_config());

    cache.put("empty", b"", None).unwrap();

    // An empty value is distinguishable from an absent key.
    assert_eq!(cache.get("empty").unwrap(), Some(Vec::new()));
}

#[test]
fn memory_usage_tracks_puts_and_deletes() {
    let mut config = test_config();
    config.max_memory_mb = 16;
    let (cache, _dir) = open_cache(config);

    let baseline = cache.memory_usage();

    cache.put("acct_key_1", b"v1", None).unwrap();
    let after_first = cache.memory_usage();
    assert!(after_first > baseline);

    cache.put("acct_key_2", b"v2", None).unwrap();
    let after_second = cache.memory_usage();
    assert!(after_second > after_first);

    cache.delete("acct_key_1").unwrap();
    assert!(cache.memory_usage() < after_second);

    cache.delete("acct_key_2").unwrap();
    assert_eq!(cache.memory_usage(), baseline);
}

#[test]
fn behavior_is_identical_across_engines() {
    for engine in [EngineKind::Sled, EngineKind::Redb] {
        let mut config = test_config();
        config.engine = engine;
        let (cache, _dir) = open_cache(config);

        cache.put("shared_key", b"shared_value", None).unwrap();
        assert_eq!(
            cache.get("shared_key").unwrap(),
            Some(b"shared_value".to_vec()),
            "get mismatch on {engine:?}"
        );

        cache.put("fleeting", b"x", Some(1)).unwrap();
        std::thread::sleep(Duration::from_millis(2100));
        assert_eq!(
            cache.get("fleeting").unwrap(),
            None,
            "expiry mismatch on {engine:?}"
        );

        cache.delete("shared_key").unwrap();
        assert_eq!(cache.get("shared_key").unwrap(), None);
    }
}

#[tokio::test]
async fn fresh_open_discards_prior_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store");

    let cache = Cache::open(&path, test_config()).unwrap();
    cache.put("left_behind", b"bytes", None).unwrap();
    cache.close().await.unwrap();

    let cache = Cache::open(&path, test_config()).unwrap();
    assert_eq!(cache.get("left_behind").unwrap(), None);
    cache.close().await.unwrap();
}

#[tokio::test]
async fn recover_restores_live_keys_and_drops_expired() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store");

    let cache = Cache::open(&path, test_config()).unwrap();
    cache.put("survivor", b"durable", Some(600)).unwrap();
    cache.put("doomed", b"expires first", Some(1)).unwrap();
    cache.close().await.unwrap();

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let mut config = test_config();
    config.recover = true;
    let cache = Cache::open(&path, config).unwrap();

    assert_eq!(cache.get("survivor").unwrap(), Some(b"durable".to_vec()));
    assert_eq!(cache.get("doomed").unwrap(), None);
    assert_eq!(cache.len(), 1);
    cache.close().await.unwrap();
}

#[test]
fn concurrent_callers_keep_the_cache_consistent() {
    use std::sync::Arc;

    let (cache, _dir) = open_cache(test_config());
    let cache = Arc::new(cache);

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..50 {
                    let key = format!("thread{t}_key{i}");
                    cache.put(&key, format!("value{i}").as_bytes(), None).unwrap();
                    assert_eq!(
                        cache.get(&key).unwrap(),
                        Some(format!("value{i}").into_bytes())
                    );
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(cache.len(), 4 * 50);
}
