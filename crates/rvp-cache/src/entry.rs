use serde::{Deserialize, Serialize};

/// One cached product fragment
///
/// Stored on the session tier as `{"html": "...", "expiry": <millis>}`,
/// which is the shape the storefront theme already writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "html")]
    pub fragment: String,
    /// Unix millis after which the entry is stale
    #[serde(rename = "expiry")]
    pub expires_at: i64,
}

impl CacheEntry {
    pub fn new(fragment: impl Into<String>, now_millis: i64, ttl_millis: i64) -> Self {
        Self {
            fragment: fragment.into(),
            expires_at: now_millis.saturating_add(ttl_millis),
        }
    }

    /// Fresh strictly before `expires_at`; an entry exactly at its expiry is stale
    pub fn is_fresh(&self, now_millis: i64) -> bool {
        now_millis < self.expires_at
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}
