//! Background Tasks Module
//!
//! Contains background tasks that run alongside foreground cache
//! operations.
//!
//! # Tasks
//! - TTL Cleanup: removes expired index entries at configured intervals

mod cleanup;

pub use cleanup::{spawn_cleanup_task, CleanupHandle};
