//! In-memory key-value store.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::error::Result;

use super::{check_quota, KeyValueStore};

/// A [`KeyValueStore`] held entirely in memory.
///
/// Used by tests and by callers that want a throwaway inventory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, String>>,
    quota: usize,
}

impl MemoryStore {
    /// Create an empty store without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store limited to `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: RefCell::default(),
            quota,
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let old_entry = self.entries.borrow().get(key).map(|v| key.len() + v.len());
        check_quota(key, value, self.total_size()?, old_entry, self.quota)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.borrow().keys().cloned().collect())
    }

    fn total_size(&self) -> Result<usize> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum())
    }

    fn quota(&self) -> usize {
        self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
        assert!(store.remove("k").unwrap());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_quota() {
        let store = MemoryStore::with_quota(6);
        store.set("a", "12345").unwrap();
        let err = store.set("b", "1").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.get("b").unwrap().is_none());
        assert_eq!(store.quota(), 6);
    }

    #[test]
    fn test_keys_sorted() {
        let store = MemoryStore::new();
        store.set("b", "").unwrap();
        store.set("a", "").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }
}
