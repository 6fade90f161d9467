// Tiered fragment fetcher: memory -> session -> storefront
use futures::future::join_all;
use rvp_cache::{CacheEntry, Clock, MemoryTier, SessionLookup, SessionTier, Storage, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{config::Config, providers::StorefrontProvider, source::FragmentSource, Result};

/// How long a fetched fragment stays usable
pub const CACHE_TTL: Duration = Duration::from_secs(300);

/// Resolves product handles to card fragments, cache tiers first
///
/// Resolution never fails: anything that goes wrong for one handle is logged
/// and yields an empty fragment for that handle alone.
pub struct ProductFetcher {
    source: Arc<dyn FragmentSource>,
    memory: Arc<MemoryTier>,
    session: SessionTier,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
}

impl ProductFetcher {
    pub fn new(
        source: Arc<dyn FragmentSource>,
        memory: Arc<MemoryTier>,
        session: SessionTier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            memory,
            session,
            clock,
            ttl_millis: duration_millis(CACHE_TTL),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_millis = duration_millis(ttl);
        self
    }

    /// Fetcher wired to the storefront, the process-wide memory tier and
    /// the given session storage
    pub fn from_config(config: &Config, session_storage: Arc<dyn Storage>) -> Result<Self> {
        let source = StorefrontProvider::from_config(&config.storefront)?;
        let session = SessionTier::new(session_storage, config.cache.session_prefix.clone());

        Ok(Self::new(
            Arc::new(source),
            MemoryTier::shared(),
            session,
            Arc::new(SystemClock),
        )
        .with_ttl(config.cache.ttl()))
    }

    pub fn session(&self) -> &SessionTier {
        &self.session
    }

    /// Resolve every handle except `excluding`, keeping input order
    ///
    /// All resolutions are started together and awaited jointly; the result
    /// has one entry per remaining handle, `""` where nothing resolved.
    pub async fn resolve_batch(&self, handles: &[String], excluding: Option<&str>) -> Vec<String> {
        let wanted: Vec<&str> = handles
            .iter()
            .map(String::as_str)
            .filter(|handle| Some(*handle) != excluding)
            .collect();

        debug!("Resolving {} handles", wanted.len());
        let fragments = join_all(wanted.iter().map(|handle| self.resolve(handle))).await;

        let resolved = fragments.iter().filter(|f| !f.is_empty()).count();
        info!("Resolved {}/{} product fragments", resolved, fragments.len());
        fragments
    }

    /// Resolve a single handle
    pub async fn resolve(&self, handle: &str) -> String {
        let now = self.clock.now_millis();

        if let Some(entry) = self.memory.get_fresh(handle, now) {
            debug!("Memory cache hit for {}", handle);
            return entry.fragment;
        }

        match self.session.lookup(handle, now) {
            SessionLookup::Fresh(entry) => {
                debug!("Session cache hit for {}", handle);
                let fragment = entry.fragment.clone();
                self.memory.insert(handle, entry);
                return fragment;
            }
            SessionLookup::Expired | SessionLookup::Corrupt | SessionLookup::Missing => {
                debug!("Cache miss for {}", handle);
            }
        }

        let fragment = match self.source.fetch_fragment(handle).await {
            Ok(fragment) => fragment,
            Err(e) => {
                error!("Failed to fetch fragment for {}: {}", handle, e);
                return String::new();
            }
        };

        if fragment.is_empty() {
            debug!("No fragment available for {}", handle);
            return fragment;
        }

        let entry = CacheEntry::new(fragment.clone(), now, self.ttl_millis);
        if let Err(e) = self.session.store(handle, &entry) {
            warn!("Failed to write session cache for {}: {}", handle, e);
        }
        self.memory.insert(handle, entry);

        fragment
    }
}

fn duration_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
