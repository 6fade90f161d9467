use rvp_cache::Storage;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;

/// Longest viewed list we keep
pub const MAX_ITEMS: usize = 24;

pub const DEFAULT_STORAGE_NAMESPACE: &str = "recently_viewed_handles";

/// Keeps the most-recent-first list of viewed product handles for one shop
pub struct ViewedItemsRecorder {
    storage: Arc<dyn Storage>,
    key: String,
    max_items: usize,
}

impl ViewedItemsRecorder {
    pub fn new(storage: Arc<dyn Storage>, shop_id: &str) -> Self {
        Self::with_namespace(storage, DEFAULT_STORAGE_NAMESPACE, shop_id)
    }

    pub fn with_namespace(storage: Arc<dyn Storage>, namespace: &str, shop_id: &str) -> Self {
        Self {
            storage,
            key: storage_key(namespace, shop_id),
            max_items: MAX_ITEMS,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Move `handle` to the front of the list, trimming to the cap
    pub fn record(&self, handle: &str) -> Result<()> {
        if handle.is_empty() {
            return Ok(());
        }

        let mut list = self.list();
        list.retain(|h| h != handle);
        list.insert(0, handle.to_string());
        list.truncate(self.max_items);

        let json = serde_json::to_string(&list)?;
        self.storage.set_item(&self.key, &json)?;
        debug!("Recorded view of {} ({} in history)", handle, list.len());
        Ok(())
    }

    /// Current list, most recent first
    ///
    /// A missing, unreadable or non-array value reads as an empty list.
    pub fn list(&self) -> Vec<String> {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Could not read viewed list {}: {}", self.key, e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(handle) => Some(handle),
                    _ => None,
                })
                .collect(),
            Ok(_) => {
                warn!("Viewed list {} is not an array, ignoring it", self.key);
                Vec::new()
            }
            Err(e) => {
                warn!("Viewed list {} is not valid JSON: {}", self.key, e);
                Vec::new()
            }
        }
    }

    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(&self.key)?;
        Ok(())
    }
}

/// `<namespace>_<shop_id>`
pub fn storage_key(namespace: &str, shop_id: &str) -> String {
    format!("{}_{}", namespace, shop_id)
}
