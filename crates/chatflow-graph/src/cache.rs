//! Fingerprint-keyed identity cache using moka
//!
//! Resolving a bot model is cheap but repeated on every analysis request; the
//! cache shares the resolved [`ActivityIdentity`] across requests for the same
//! model revision. Entries are immutable `Arc`s, so concurrent readers need no
//! locking, and an edited model gets a new fingerprint instead of a stale hit.

use crate::fingerprint::Fingerprint;
use crate::model::ConversationGraph;
use crate::resolver::ActivityIdentity;
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Process-wide cache of resolved activity identities
#[derive(Debug, Clone)]
pub struct IdentityCache {
    inner: Cache<Fingerprint, Arc<ActivityIdentity>>,
}

impl IdentityCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create cache with time-based expiration
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Get cached identity by fingerprint
    #[inline]
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<ActivityIdentity>> {
        self.inner.get(fingerprint)
    }

    /// Insert identity under its own fingerprint
    #[inline]
    pub fn insert(&self, identity: Arc<ActivityIdentity>) {
        self.inner.insert(identity.fingerprint(), identity);
    }

    /// Get the identity for a graph, resolving it on a miss
    pub fn get_or_resolve(&self, graph: &ConversationGraph) -> Arc<ActivityIdentity> {
        let fingerprint = graph.fingerprint();
        if let Some(cached) = self.inner.get(&fingerprint) {
            tracing::debug!(bot = graph.bot_name(), fingerprint = %fingerprint.short(), "identity cache hit");
            return cached;
        }

        tracing::debug!(bot = graph.bot_name(), fingerprint = %fingerprint.short(), "identity cache miss");
        let identity = Arc::new(ActivityIdentity::resolve(graph));
        self.inner.insert(fingerprint, Arc::clone(&identity));
        identity
    }

    /// Invalidate cache entry
    #[inline]
    pub fn invalidate(&self, fingerprint: &Fingerprint) {
        self.inner.invalidate(fingerprint);
    }

    /// Invalidate all entries
    #[inline]
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Check if cache holds a fingerprint
    #[inline]
    #[must_use]
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.contains_key(fingerprint)
    }

    /// Get cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }
}

impl Default for IdentityCache {
    /// Create cache with default capacity (1,000 bot revisions)
    fn default() -> Self {
        Self::new(1_000)
    }
}
