//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
///
/// Every variant carries the engine's own message so callers can log the
/// underlying cause without the crate leaking engine-specific error types.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The storage engine could not be created or opened
    #[error("open failed: {0}")]
    OpenFailed(String),

    /// The engine rejected a write
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The engine rejected a read
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// The engine rejected a delete
    #[error("delete failed: {0}")]
    DeleteFailed(String),

    /// The cleanup daemon could not be started during open
    #[error("cleanup daemon start failed: {0}")]
    DaemonStart(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
