//! duracache - A TTL-aware caching layer over embedded key-value stores
//!
//! Callers store byte values under string keys with optional expirations.
//! An in-memory expiry index is the sole authority on liveness, so expired
//! keys become invisible even though the backing engine knows nothing
//! about TTL.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;

mod tasks;

pub use cache::{Cache, CacheStats};
pub use config::CacheConfig;
pub use engine::EngineKind;
pub use error::{CacheError, Result};
