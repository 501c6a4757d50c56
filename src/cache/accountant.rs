//! Memory Accountant Module
//!
//! Explicit byte bookkeeping for the expiry index. Values live in the
//! engine, so the accountant only charges for per-key in-memory state:
//! the index entry plus the LRU slot.

// == Entry Cost ==
/// Approximate heap overhead per indexed key beyond the key bytes
/// themselves: the map entry, the metadata and the VecDeque slot.
const ENTRY_OVERHEAD_BYTES: u64 = 64;

// == Memory Accountant ==
/// Tracks bytes used by index bookkeeping against an optional budget.
#[derive(Debug)]
pub struct MemoryAccountant {
    /// Bytes currently charged
    used_bytes: u64,
    /// Ceiling in bytes, 0 = unlimited
    budget_bytes: u64,
}

impl MemoryAccountant {
    // == Constructor ==
    /// Creates an accountant with the given budget. A zero budget disables
    /// the ceiling but usage is still tracked.
    pub fn new(budget_bytes: u64) -> Self {
        Self {
            used_bytes: 0,
            budget_bytes,
        }
    }

    // == Entry Cost ==
    /// Bytes one indexed key costs. The key is stored twice (index map and
    /// LRU tracker), plus fixed per-entry overhead.
    pub fn entry_cost(key: &str) -> u64 {
        key.len() as u64 * 2 + ENTRY_OVERHEAD_BYTES
    }

    // == Charge ==
    /// Records the cost of indexing `key`.
    pub fn charge(&mut self, key: &str) {
        self.used_bytes += Self::entry_cost(key);
    }

    // == Refund ==
    /// Releases the cost previously charged for `key`.
    pub fn refund(&mut self, key: &str) {
        self.used_bytes = self.used_bytes.saturating_sub(Self::entry_cost(key));
    }

    // == Would Exceed ==
    /// Checks whether indexing `key` would push usage past the budget.
    /// Always false when no budget is set.
    pub fn would_exceed(&self, key: &str) -> bool {
        self.budget_bytes > 0 && self.used_bytes + Self::entry_cost(key) > self.budget_bytes
    }

    /// Bytes currently charged.
    pub fn used_bytes(&self) -> u64 {
        self.used_bytes
    }
}
