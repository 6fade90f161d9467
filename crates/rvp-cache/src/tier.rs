use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing::{debug, warn};

use crate::entry::CacheEntry;
use crate::storage::{Result, Storage};

static SHARED_MEMORY_TIER: OnceLock<Arc<MemoryTier>> = OnceLock::new();

/// Fastest tier: fragments held in process memory
///
/// Entries are cloned in and out, so a caller mutating what it got back
/// never touches what the tier holds.
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide instance, created empty on first use
    pub fn shared() -> Arc<MemoryTier> {
        SHARED_MEMORY_TIER
            .get_or_init(|| Arc::new(MemoryTier::new()))
            .clone()
    }

    /// Fresh entry for `handle`, if any. Stale entries are left in place;
    /// the next successful fetch overwrites them.
    pub fn get_fresh(&self, handle: &str, now_millis: i64) -> Option<CacheEntry> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(handle)
            .filter(|entry| entry.is_fresh(now_millis))
            .cloned()
    }

    pub fn insert(&self, handle: &str, entry: CacheEntry) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(handle.to_string(), entry);
    }

    /// Drop everything (the page-unload equivalent)
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the session tier had for a handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Fresh(CacheEntry),
    /// Found but stale; the slot has been removed
    Expired,
    /// Slot held something that is not a cache entry
    Corrupt,
    Missing,
}

/// Session-scoped tier: one storage slot per handle under `<prefix><handle>`
pub struct SessionTier {
    storage: Arc<dyn Storage>,
    prefix: String,
}

impl SessionTier {
    pub fn new(storage: Arc<dyn Storage>, prefix: impl Into<String>) -> Self {
        Self {
            storage,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, handle: &str) -> String {
        format!("{}{}", self.prefix, handle)
    }

    /// Look up `handle`, purging the slot if the entry has expired
    ///
    /// Storage failures are logged and reported as `Missing`; nothing here
    /// is allowed to fail a resolution.
    pub fn lookup(&self, handle: &str, now_millis: i64) -> SessionLookup {
        let key = self.key(handle);

        let raw = match self.storage.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SessionLookup::Missing,
            Err(e) => {
                warn!("Session cache read failed for {}: {}", handle, e);
                return SessionLookup::Missing;
            }
        };

        let entry = match CacheEntry::from_json(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Session cache entry for {} is unreadable: {}", handle, e);
                return SessionLookup::Corrupt;
            }
        };

        if entry.is_fresh(now_millis) {
            return SessionLookup::Fresh(entry);
        }

        debug!("Session cache entry for {} expired, removing", handle);
        if let Err(e) = self.storage.remove_item(&key) {
            warn!("Failed to remove expired session entry {}: {}", key, e);
        }
        SessionLookup::Expired
    }

    pub fn store(&self, handle: &str, entry: &CacheEntry) -> Result<()> {
        let json = entry.to_json()?;
        self.storage.set_item(&self.key(handle), &json)
    }

    /// Remove every slot under this tier's prefix, returning how many went
    pub fn clear(&self) -> Result<usize> {
        let keys: Vec<String> = self
            .storage
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(&self.prefix))
            .collect();

        for key in &keys {
            self.storage.remove_item(key)?;
        }

        Ok(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const TTL: i64 = 300_000;

    #[test]
    fn test_memory_tier_returns_copies() {
        let tier = MemoryTier::new();
        tier.insert("shirt", CacheEntry::new("<div>shirt</div>", 0, TTL));

        let mut got = tier.get_fresh("shirt", 10).unwrap();
        got.fragment.push_str("mutated");

        assert_eq!(tier.get_fresh("shirt", 10).unwrap().fragment, "<div>shirt</div>");
    }

    #[test]
    fn test_memory_tier_ignores_stale_entries() {
        let tier = MemoryTier::new();
        tier.insert("shirt", CacheEntry::new("x", 0, TTL));

        assert!(tier.get_fresh("shirt", TTL - 1).is_some());
        assert!(tier.get_fresh("shirt", TTL).is_none());
        assert!(tier.get_fresh("missing", 0).is_none());

        tier.clear();
        assert!(tier.is_empty());
    }

    #[test]
    fn test_shared_tier_is_one_instance() {
        let a = MemoryTier::shared();
        let b = MemoryTier::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_session_lookup_fresh_and_expired() {
        let storage = Arc::new(MemoryStorage::new());
        let tier = SessionTier::new(storage.clone(), "rvp_");
        let entry = CacheEntry::new("<div>hat</div>", 1_000, TTL);
        tier.store("hat", &entry).unwrap();

        assert!(storage.get_item("rvp_hat").unwrap().is_some());
        assert_eq!(tier.lookup("hat", 1_000 + TTL - 1), SessionLookup::Fresh(entry));

        assert_eq!(tier.lookup("hat", 1_000 + TTL), SessionLookup::Expired);
        // Expired slot is purged
        assert_eq!(storage.get_item("rvp_hat").unwrap(), None);
        assert_eq!(tier.lookup("hat", 1_000 + TTL), SessionLookup::Missing);
    }

    #[test]
    fn test_session_lookup_corrupt_is_not_fatal() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("rvp_hat", "{definitely not json").unwrap();

        let tier = SessionTier::new(storage, "rvp_");
        assert_eq!(tier.lookup("hat", 0), SessionLookup::Corrupt);
    }

    #[test]
    fn test_session_clear_only_touches_prefix() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("recently_viewed_handles_1", "[]").unwrap();

        let tier = SessionTier::new(storage.clone(), "rvp_");
        tier.store("a", &CacheEntry::new("a", 0, TTL)).unwrap();
        tier.store("b", &CacheEntry::new("b", 0, TTL)).unwrap();

        assert_eq!(tier.clear().unwrap(), 2);
        assert_eq!(storage.len(), 1);
        assert!(storage.get_item("recently_viewed_handles_1").unwrap().is_some());
    }
}
