//! Sled engine binding
//!
//! Log-structured engine with an internal page cache. The store lives in a
//! directory of segment files managed entirely by sled.

use crate::engine::{EngineOptions, StorageEngine};
use crate::error::{CacheError, Result};

/// Cache records persisted through a sled tree.
pub struct SledEngine {
    db: sled::Db,
}

impl SledEngine {
    /// Opens (or creates) a sled store at `options.path`.
    ///
    /// Sled creates missing stores unconditionally, so `create_if_missing`
    /// has no effect here.
    pub fn open(options: &EngineOptions) -> Result<Self> {
        let mut config = sled::Config::new().path(&options.path);
        if let Some(bytes) = options.cache_bytes {
            config = config.cache_capacity(bytes);
        }

        let db = config
            .open()
            .map_err(|e| CacheError::OpenFailed(e.to_string()))?;

        Ok(Self { db })
    }
}

impl StorageEngine for SledEngine {
    fn name(&self) -> &'static str {
        "sled"
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .insert(key, value)
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .db
            .get(key)
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .remove(key)
            .map_err(|e| CacheError::DeleteFailed(e.to_string()))?;
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<()> {
        for item in self.db.iter() {
            let (key, value) = item.map_err(|e| CacheError::ReadFailed(e.to_string()))?;
            visit(&key, &value);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}
