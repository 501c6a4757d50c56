//! Cache Store Module
//!
//! The cache core: an in-memory expiry index orchestrating an embedded
//! storage engine. The index is the sole authority on liveness; engine
//! records are only reachable through it. Values are persisted with their
//! expiration timestamp appended so an index can be rebuilt after a
//! reopen.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::cache::{
    CacheStats, ExpiryIndex, KeyMetadata, LruTracker, MemoryAccountant, FALLBACK_TTL_SECS,
};
use crate::config::CacheConfig;
use crate::engine::{self, EngineOptions, StorageEngine};
use crate::error::Result;
use crate::tasks::{spawn_cleanup_task, CleanupHandle};

// == Record Framing ==
/// Every stored record carries its expiration timestamp in the last eight
/// bytes, little-endian.
const EXPIRY_SUFFIX_LEN: usize = std::mem::size_of::<u64>();

fn encode_record(value: &[u8], expires_at: u64) -> Vec<u8> {
    let mut record = Vec::with_capacity(value.len() + EXPIRY_SUFFIX_LEN);
    record.extend_from_slice(value);
    record.extend_from_slice(&expires_at.to_le_bytes());
    record
}

fn decode_record(record: &[u8]) -> Option<(&[u8], u64)> {
    if record.len() < EXPIRY_SUFFIX_LEN {
        return None;
    }
    let (value, suffix) = record.split_at(record.len() - EXPIRY_SUFFIX_LEN);
    let expires_at = u64::from_le_bytes(suffix.try_into().ok()?);
    Some((value, expires_at))
}

// == Cache ==
/// Handle to an open cache.
///
/// Cheap to share behind the scenes: all operations take `&self` and
/// synchronize on an internal mutex, so the handle can be used from
/// multiple threads or tasks at once.
pub struct Cache {
    shared: Arc<CacheShared>,
    cleanup: Option<CleanupHandle>,
}

/// State shared between the handle and the cleanup daemon.
pub(crate) struct CacheShared {
    /// The embedded engine holding the records
    engine: Box<dyn StorageEngine>,
    /// Index, LRU order, accounting and counters under one lock
    state: Mutex<CacheState>,
    /// TTL applied to puts without an explicit one
    default_ttl_secs: u64,
    /// Bytes handed to the engine's native read cache at open
    native_cache_bytes: u64,
}

/// Everything the mutex guards. Index, LRU tracker and accountant must
/// only change together, engine call included, so readers never observe a
/// half-applied operation.
struct CacheState {
    index: ExpiryIndex,
    lru: LruTracker,
    accountant: MemoryAccountant,
    stats: CacheStats,
}

impl Cache {
    // == Open ==
    /// Opens a cache backed by an embedded engine at `path`.
    ///
    /// Unless `config.recover` is set, any prior store at `path` is
    /// destroyed first; a destroy failure is logged and not fatal. With
    /// `recover`, surviving records are scanned to rebuild the expiry
    /// index and already-expired records are reclaimed on the way.
    ///
    /// Half of `config.max_memory_mb` is handed to the engine's native
    /// read cache, the other half bounds index bookkeeping; a zero budget
    /// disables both.
    ///
    /// When `config.cleanup_interval_secs` is nonzero the cleanup daemon
    /// is spawned on the current tokio runtime, so open must then be
    /// called from within one.
    pub fn open(path: impl AsRef<Path>, config: CacheConfig) -> Result<Cache> {
        let path = path.as_ref();

        if !config.recover {
            engine::destroy_store(path);
        }

        let total_budget_bytes = config.max_memory_mb.saturating_mul(1024 * 1024);
        let native_cache_bytes = total_budget_bytes / 2;
        let index_budget_bytes = total_budget_bytes - native_cache_bytes;

        // A recovery open must find an existing store; a fresh open starts
        // from nothing and creates one.
        let options = EngineOptions {
            path: path.to_path_buf(),
            create_if_missing: !config.recover,
            cache_bytes: (native_cache_bytes > 0).then_some(native_cache_bytes),
        };
        let engine = engine::open_engine(config.engine, &options)?;

        let default_ttl_secs = if config.default_ttl_secs == 0 {
            FALLBACK_TTL_SECS
        } else {
            config.default_ttl_secs
        };

        let mut state = CacheState {
            index: ExpiryIndex::new(),
            lru: LruTracker::new(),
            accountant: MemoryAccountant::new(index_budget_bytes),
            stats: CacheStats::new(),
        };
        if config.recover {
            rebuild_index(engine.as_ref(), &mut state)?;
        }

        let shared = Arc::new(CacheShared {
            engine,
            state: Mutex::new(state),
            default_ttl_secs,
            native_cache_bytes,
        });

        let cleanup = if config.cleanup_interval_secs > 0 {
            Some(spawn_cleanup_task(
                Arc::clone(&shared),
                config.cleanup_interval_secs,
            )?)
        } else {
            None
        };

        info!(
            path = %path.display(),
            engine = shared.engine.name(),
            native_ttl = shared.engine.supports_native_ttl(),
            default_ttl_secs,
            "cache opened"
        );

        Ok(Cache { shared, cleanup })
    }

    // == Put ==
    /// Stores `value` under `key`.
    ///
    /// `None` or an explicit zero TTL selects the default configured at
    /// open. Overwriting an existing key replaces both its value and its
    /// expiration. If the engine rejects the write the index is left
    /// untouched, so a failed put is never visible to readers.
    pub fn put(&self, key: &str, value: &[u8], ttl_seconds: Option<u64>) -> Result<()> {
        self.shared.put(key, value, ttl_seconds)
    }

    // == Get ==
    /// Retrieves the value stored under `key`.
    ///
    /// Returns `Ok(None)` for unknown and expired keys; an expired key is
    /// reclaimed on the way out. Reading neither extends nor shortens a
    /// key's TTL.
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.shared.get(key)
    }

    // == Delete ==
    /// Removes `key` from the index and the engine.
    ///
    /// Deleting an absent key succeeds. If the engine rejects the delete
    /// the index entry is restored and the error surfaced.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.shared.delete(key)
    }

    // == Memory Usage ==
    /// Bytes currently attributed to the cache: the engine's native read
    /// cache budget plus live index bookkeeping.
    pub fn memory_usage(&self) -> u64 {
        self.shared.memory_usage()
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.shared.stats()
    }

    // == Length ==
    /// Returns the number of live keys in the index.
    pub fn len(&self) -> usize {
        self.shared.lock_state().index.len()
    }

    /// Returns true when no keys are live.
    pub fn is_empty(&self) -> bool {
        self.shared.lock_state().index.is_empty()
    }

    // == Close ==
    /// Stops the cleanup daemon, flushes the engine and consumes the
    /// handle.
    ///
    /// The daemon observes the stop signal on its next wake-up at the
    /// latest, so joining it is bounded by one cleanup interval.
    pub async fn close(mut self) -> Result<()> {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.stop().await;
        }
        self.shared.engine.flush()?;
        info!("cache closed");
        Ok(())
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("engine", &self.shared.engine.name())
            .field("default_ttl_secs", &self.shared.default_ttl_secs)
            .finish()
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        // Normal shutdown goes through close(). A plain drop still signals
        // the daemon so it exits on its next wake-up.
        if let Some(cleanup) = self.cleanup.take() {
            cleanup.signal_stop();
        }
    }
}

impl CacheShared {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // A poisoned lock means a panic mid-operation; index and engine
        // are each still internally consistent, so keep serving.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn put(&self, key: &str, value: &[u8], ttl_seconds: Option<u64>) -> Result<()> {
        let ttl = match ttl_seconds {
            Some(ttl) if ttl > 0 => ttl,
            _ => self.default_ttl_secs,
        };
        let meta = KeyMetadata::new(ttl);

        let mut state = self.lock_state();

        let is_new = !state.index.contains(key);
        if is_new && state.accountant.would_exceed(key) {
            self.evict_for_space(&mut state, key);
        }

        // Engine write first. If it fails the index stays untouched, so a
        // reader can never see a key whose record was not stored.
        self.engine
            .put(key.as_bytes(), &encode_record(value, meta.expires_at))?;

        if is_new {
            state.accountant.charge(key);
        }
        state.index.upsert(key, meta);
        state.lru.touch(key);

        let live = state.index.len();
        state.stats.set_live_entries(live);
        Ok(())
    }

    pub(crate) fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut state = self.lock_state();

        let Some(meta) = state.index.get(key).copied() else {
            state.stats.record_miss();
            return Ok(None);
        };

        if meta.is_expired() {
            // Lazy expiry: reclaim through the same path as an explicit
            // delete, then report a miss.
            match self.remove_entry(&mut state, key) {
                Ok(_) => state.stats.record_expiration(),
                Err(err) => warn!(key, %err, "failed to reclaim expired key during get"),
            }
            let live = state.index.len();
            state.stats.set_live_entries(live);
            state.stats.record_miss();
            return Ok(None);
        }

        match self.engine.get(key.as_bytes())? {
            Some(record) => match decode_record(&record) {
                Some((value, _)) => {
                    state.lru.touch(key);
                    state.stats.record_hit();
                    debug!(key, ttl_remaining = ?meta.ttl_remaining(), "cache hit");
                    Ok(Some(value.to_vec()))
                }
                None => {
                    warn!(key, "stored record is shorter than the expiry suffix");
                    state.stats.record_miss();
                    Ok(None)
                }
            },
            None => {
                // The index says live but the engine has no record. Report
                // a miss and leave both sides alone for inspection.
                warn!(key, "index and engine disagree: live key has no record");
                state.stats.record_miss();
                Ok(None)
            }
        }
    }

    pub(crate) fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.lock_state();
        self.remove_entry(&mut state, key)?;

        let live = state.index.len();
        state.stats.set_live_entries(live);
        Ok(())
    }

    // == Sweep Expired ==
    /// One cleanup pass: removes every indexed key whose expiration has
    /// passed. Returns the number of keys removed.
    pub(crate) fn sweep_expired(&self) -> usize {
        let mut state = self.lock_state();
        let expired = state.index.expired_keys();

        let mut removed = 0;
        for key in expired {
            match self.remove_entry(&mut state, &key) {
                Ok(true) => {
                    state.stats.record_expiration();
                    removed += 1;
                }
                Ok(false) => {}
                Err(err) => warn!(key = %key, %err, "sweep delete failed, entry kept for retry"),
            }
        }

        let live = state.index.len();
        state.stats.set_live_entries(live);
        removed
    }

    pub(crate) fn memory_usage(&self) -> u64 {
        self.native_cache_bytes + self.lock_state().accountant.used_bytes()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        let state = self.lock_state();
        let mut stats = state.stats.clone();
        stats.set_live_entries(state.index.len());
        stats
    }

    // == Remove Entry ==
    /// Shared delete procedure: the index entry goes first, the engine
    /// record second, and a refused engine delete rolls the index entry
    /// back so both sides keep agreeing.
    ///
    /// Returns whether an indexed entry was removed.
    fn remove_entry(&self, state: &mut CacheState, key: &str) -> Result<bool> {
        let Some(meta) = state.index.remove(key) else {
            // Not indexed: still clear any unreachable record bytes.
            // Deleting an absent key is not an error.
            self.engine.delete(key.as_bytes())?;
            return Ok(false);
        };

        state.lru.remove(key);
        state.accountant.refund(key);

        if let Err(err) = self.engine.delete(key.as_bytes()) {
            // The record is still in the engine, so the key must stay
            // indexed. It re-enters the LRU at the recent end.
            state.accountant.charge(key);
            state.lru.touch(key);
            state.index.upsert(key, meta);
            return Err(err);
        }
        Ok(true)
    }

    // == Evict For Space ==
    /// Frees index budget for an incoming key by deleting least recently
    /// used entries, engine records included. Best effort: stops early if
    /// the engine refuses a delete or nothing is left to evict.
    fn evict_for_space(&self, state: &mut CacheState, incoming: &str) {
        while state.accountant.would_exceed(incoming) {
            let Some(victim) = state.lru.peek_lru().cloned() else {
                break;
            };
            match self.remove_entry(state, &victim) {
                Ok(_) => {
                    state.stats.record_eviction();
                    debug!(key = %victim, "evicted under memory pressure");
                }
                Err(err) => {
                    warn!(key = %victim, %err, "eviction delete failed");
                    break;
                }
            }
        }
    }
}

// == Index Rebuild ==
/// Scans the engine and repopulates the index from records whose
/// expiration has not passed. Expired and undecodable records are
/// reclaimed; a failed reclaim is logged and skipped.
fn rebuild_index(engine: &dyn StorageEngine, state: &mut CacheState) -> Result<()> {
    let mut stale: Vec<Vec<u8>> = Vec::new();
    let mut restored = 0usize;

    engine.scan(&mut |key, record| {
        let parsed = std::str::from_utf8(key).ok().zip(decode_record(record));
        match parsed {
            Some((key, (_, expires_at))) => {
                let meta = KeyMetadata::from_epoch(expires_at);
                if meta.is_expired() {
                    stale.push(key.as_bytes().to_vec());
                } else {
                    state.accountant.charge(key);
                    state.lru.touch(key);
                    state.index.upsert(key, meta);
                    restored += 1;
                }
            }
            None => stale.push(key.to_vec()),
        }
    })?;

    for key in &stale {
        if let Err(err) = engine.delete(key) {
            warn!(%err, "failed to reclaim stale record during rebuild");
        }
    }

    state.stats.set_live_entries(state.index.len());
    info!(restored, reclaimed = stale.len(), "rebuilt expiry index from store");
    Ok(())
}
