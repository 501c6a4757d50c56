//! Storage Engine Layer
//!
//! A uniform contract over the embedded key-value engines the cache can sit
//! on. The cache core only ever talks to `dyn StorageEngine`, so engines are
//! interchangeable at open time and everything above this layer is
//! engine-agnostic.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::warn;

use crate::error::Result;

mod redb;
mod sled;

pub use self::redb::RedbEngine;
pub use self::sled::SledEngine;

// == Storage Engine Trait ==
/// Byte-oriented operations every embedded engine must provide.
///
/// Implementations are internally synchronized; all methods take `&self`
/// and individual calls are atomic with respect to each other.
pub trait StorageEngine: Send + Sync {
    /// Human-readable engine name for logs.
    fn name(&self) -> &'static str;

    /// Whether the engine could expire records on its own.
    ///
    /// Purely informational: the cache enforces TTL at the orchestration
    /// layer regardless, so behavior does not depend on this flag.
    fn supports_native_ttl(&self) -> bool {
        false
    }

    /// Stores a record under `key`, replacing any previous record.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Fetches the record stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Removes the record stored under `key`. Absent keys are not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Visits every record in the store. Used to rebuild in-memory state
    /// after a reopen.
    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<()>;

    /// Blocks until previously written records are durable.
    fn flush(&self) -> Result<()>;
}

// == Engine Selection ==
/// Identifies one of the supported embedded engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Log-structured engine with its own page cache
    #[default]
    Sled,
    /// Single-file B-tree engine with ACID transactions
    Redb,
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sled" => Ok(EngineKind::Sled),
            "redb" => Ok(EngineKind::Redb),
            other => Err(format!("unknown engine kind: {other}")),
        }
    }
}

/// Open-time options shared by all engines.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Directory holding the store's files
    pub path: PathBuf,
    /// Create the store when none exists at `path`
    pub create_if_missing: bool,
    /// Native read-cache budget in bytes, when the engine has one
    pub cache_bytes: Option<u64>,
}

/// Opens the engine selected by `kind` with the given options.
pub fn open_engine(kind: EngineKind, options: &EngineOptions) -> Result<Box<dyn StorageEngine>> {
    match kind {
        EngineKind::Sled => Ok(Box::new(SledEngine::open(options)?)),
        EngineKind::Redb => Ok(Box::new(RedbEngine::open(options)?)),
    }
}

/// Removes any store files left at `path` by a previous open.
///
/// Failure is non-fatal; the subsequent open decides whether leftover state
/// is a problem.
pub fn destroy_store(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(err) = std::fs::remove_dir_all(path) {
        warn!(path = %path.display(), %err, "failed to destroy prior store");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_kind_from_str() {
        assert_eq!("sled".parse::<EngineKind>().unwrap(), EngineKind::Sled);
        assert_eq!("REDB".parse::<EngineKind>().unwrap(), EngineKind::Redb);
        assert!("leveldb".parse::<EngineKind>().is_err());
    }

    #[test]
    fn test_open_engine_factory() {
        for kind in [EngineKind::Sled, EngineKind::Redb] {
            let dir = tempfile::tempdir().unwrap();
            let options = EngineOptions {
                path: dir.path().join("store"),
                create_if_missing: true,
                cache_bytes: None,
            };
            let engine = open_engine(kind, &options).unwrap();
            engine.put(b"k", b"v").unwrap();
            assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
        }
    }

    #[test]
    fn test_destroy_store_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("junk"), b"bytes").unwrap();

        destroy_store(&path);
        assert!(!path.exists());

        // Missing paths are a silent no-op.
        destroy_store(&path);
    }
}
