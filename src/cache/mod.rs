//! Cache Module
//!
//! The TTL-aware core: the expiry index that decides key liveness, the
//! store orchestrating it against an embedded engine, and the memory
//! bookkeeping that bounds the index.

mod accountant;
mod index;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use index::{ExpiryIndex, KeyMetadata};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::Cache;

pub(crate) use accountant::MemoryAccountant;
pub(crate) use index::unix_now_secs;
pub(crate) use store::CacheShared;

// == Public Constants ==
/// TTL applied when a cache is opened with a default TTL of zero.
pub const FALLBACK_TTL_SECS: u64 = 24 * 60 * 60;
