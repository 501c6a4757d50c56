//! Redb engine binding
//!
//! Single-file B-tree engine with ACID transactions. Every mutation runs in
//! its own write transaction, so a committed record is already durable and
//! `flush` has nothing left to do.

use redb::{Builder, Database, ReadableTable, TableDefinition};

use crate::engine::{EngineOptions, StorageEngine};
use crate::error::{CacheError, Result};

const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// File name inside the store directory, so both engines share the
/// directory-per-store layout.
const DB_FILE: &str = "cache.redb";

/// Cache records persisted through a redb table.
pub struct RedbEngine {
    db: Database,
}

impl RedbEngine {
    /// Opens (or creates) a redb store underneath `options.path`.
    pub fn open(options: &EngineOptions) -> Result<Self> {
        std::fs::create_dir_all(&options.path)
            .map_err(|e| CacheError::OpenFailed(e.to_string()))?;
        let file = options.path.join(DB_FILE);

        let mut builder = Builder::new();
        if let Some(bytes) = options.cache_bytes {
            builder.set_cache_size(bytes as usize);
        }

        let db = if options.create_if_missing {
            builder.create(&file)
        } else {
            builder.open(&file)
        }
        .map_err(|e| CacheError::OpenFailed(e.to_string()))?;

        // Make sure the table exists so reads and scans on a fresh store
        // do not fail with a missing-table error.
        let txn = db
            .begin_write()
            .map_err(|e| CacheError::OpenFailed(e.to_string()))?;
        {
            txn.open_table(RECORDS)
                .map_err(|e| CacheError::OpenFailed(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| CacheError::OpenFailed(e.to_string()))?;

        Ok(Self { db })
    }
}

impl StorageEngine for RedbEngine {
    fn name(&self) -> &'static str {
        "redb"
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS)
                .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
            table
                .insert(key, value)
                .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| CacheError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        let table = txn
            .open_table(RECORDS)
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        let value = table
            .get(key)
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| CacheError::DeleteFailed(e.to_string()))?;
        {
            let mut table = txn
                .open_table(RECORDS)
                .map_err(|e| CacheError::DeleteFailed(e.to_string()))?;
            table
                .remove(key)
                .map_err(|e| CacheError::DeleteFailed(e.to_string()))?;
        }
        txn.commit()
            .map_err(|e| CacheError::DeleteFailed(e.to_string()))?;
        Ok(())
    }

    fn scan(&self, visit: &mut dyn FnMut(&[u8], &[u8])) -> Result<()> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        let table = txn
            .open_table(RECORDS)
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?;
        for item in table
            .iter()
            .map_err(|e| CacheError::ReadFailed(e.to_string()))?
        {
            let (key, value) = item.map_err(|e| CacheError::ReadFailed(e.to_string()))?;
            visit(key.value(), value.value());
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        // Commits are durable per transaction.
        Ok(())
    }
}
