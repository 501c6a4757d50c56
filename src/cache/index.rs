//! Expiry Index Module
//!
//! The in-memory source of truth for which keys are live. A key is visible
//! to readers only while it has an index entry whose expiration has not
//! passed; bytes in the engine without an index entry are unreachable
//! garbage awaiting reclamation.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

// == Key Metadata ==
/// Expiration metadata tracked for a single live key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMetadata {
    /// Expiration timestamp (Unix seconds), 0 = never expires
    pub expires_at: u64,
}

impl KeyMetadata {
    // == Constructor ==
    /// Creates metadata expiring `ttl_seconds` from now.
    ///
    /// A TTL large enough to push the expiration past `u64::MAX` saturates
    /// there, so absurd TTLs mean "practically never" instead of wrapping
    /// into the past.
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            expires_at: unix_now_secs().saturating_add(ttl_seconds),
        }
    }

    /// Creates metadata from an expiration timestamp recovered out of a
    /// stored record.
    pub fn from_epoch(expires_at: u64) -> Self {
        Self { expires_at }
    }

    // == Is Expired ==
    /// Checks if the key has expired.
    ///
    /// Boundary condition: a key expires once the clock has moved strictly
    /// past its expiration second. A key stored with a 1 second TTL is
    /// still readable during that whole second and becomes a miss on the
    /// next one.
    ///
    /// # Returns
    /// - `true` if an expiration is set and the current time is past it
    /// - `false` if the key never expires or the TTL hasn't fully elapsed
    pub fn is_expired(&self) -> bool {
        self.expires_at != 0 && unix_now_secs() > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in seconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the key has expired
    /// - `Some(remaining_seconds)` otherwise
    /// - `None` if the key never expires
    pub fn ttl_remaining(&self) -> Option<u64> {
        if self.expires_at == 0 {
            return None;
        }
        Some(self.expires_at.saturating_sub(unix_now_secs()))
    }
}

// == Expiry Index ==
/// Maps every live key to its expiration metadata.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    entries: HashMap<String, KeyMetadata>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the metadata for `key`, if the key is indexed.
    pub fn get(&self, key: &str) -> Option<&KeyMetadata> {
        self.entries.get(key)
    }

    /// Checks whether `key` is indexed, expired or not.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Upsert ==
    /// Inserts metadata for a new key or updates an existing entry in
    /// place, so a key is never indexed twice.
    ///
    /// # Returns
    /// `true` when the key was not indexed before.
    pub fn upsert(&mut self, key: &str, meta: KeyMetadata) -> bool {
        match self.entries.get_mut(key) {
            Some(existing) => {
                *existing = meta;
                false
            }
            None => {
                self.entries.insert(key.to_string(), meta);
                true
            }
        }
    }

    /// Removes and returns the metadata for `key`.
    pub fn remove(&mut self, key: &str) -> Option<KeyMetadata> {
        self.entries.remove(key)
    }

    // == Expired Snapshot ==
    /// Collects the keys whose expiration has passed, for the cleanup
    /// daemon to remove.
    pub fn expired_keys(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, meta)| meta.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of indexed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no keys are indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in seconds.
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_metadata_with_ttl_is_live() {
        let meta = KeyMetadata::new(60);

        assert!(meta.expires_at > unix_now_secs());
        assert!(!meta.is_expired());
    }

    #[test]
    fn test_metadata_never_expires() {
        let meta = KeyMetadata::from_epoch(0);

        assert!(!meta.is_expired());
        assert!(meta.ttl_remaining().is_none());
    }

    #[test]
    fn test_metadata_expiration() {
        // 1 second TTL, expired only once that second has fully passed
        let meta = KeyMetadata::new(1);

        assert!(!meta.is_expired());

        sleep(Duration::from_millis(2100));

        assert!(meta.is_expired());
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_overflowing() {
        let meta = KeyMetadata::new(u64::MAX);

        assert_eq!(meta.expires_at, u64::MAX);
        assert!(!meta.is_expired());
    }

    #[test]
    fn test_expiration_boundary_condition() {
        // Expires exactly now: not expired until the clock moves past it
        let at_now = KeyMetadata::from_epoch(unix_now_secs());
        assert!(!at_now.is_expired(), "boundary second is still live");

        let in_the_past = KeyMetadata::from_epoch(unix_now_secs() - 1);
        assert!(in_the_past.is_expired());
    }

    #[test]
    fn test_ttl_remaining() {
        let meta = KeyMetadata::new(10);

        let remaining = meta.ttl_remaining().unwrap();
        assert!(remaining <= 10);
        assert!(remaining >= 9);

        let expired = KeyMetadata::from_epoch(unix_now_secs() - 5);
        assert_eq!(expired.ttl_remaining().unwrap(), 0);
    }

    #[test]
    fn test_upsert_new_and_existing() {
        let mut index = ExpiryIndex::new();

        assert!(index.upsert("k", KeyMetadata::new(10)));
        assert_eq!(index.len(), 1);

        // Updating the same key must not create a second entry
        assert!(!index.upsert("k", KeyMetadata::new(20)));
        assert_eq!(index.len(), 1);

        let meta = index.get("k").unwrap();
        assert!(meta.expires_at >= unix_now_secs() + 19);
    }

    #[test]
    fn test_remove() {
        let mut index = ExpiryIndex::new();
        index.upsert("k", KeyMetadata::new(10));

        assert!(index.remove("k").is_some());
        assert!(index.remove("k").is_none());
        assert!(index.is_empty());
    }

    #[test]
    fn test_expired_keys_snapshot() {
        let mut index = ExpiryIndex::new();
        index.upsert("live", KeyMetadata::new(60));
        index.upsert("forever", KeyMetadata::from_epoch(0));
        index.upsert("gone", KeyMetadata::from_epoch(unix_now_secs() - 1));

        let expired = index.expired_keys();
        assert_eq!(expired, vec!["gone".to_string()]);
    }
}
