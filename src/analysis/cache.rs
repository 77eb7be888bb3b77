//! TTL cache for website analyses.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::analysis::config::CacheConfig;
use crate::analysis::types::WebsiteAnalysis;

#[derive(Clone)]
struct CacheEntry {
    analysis: WebsiteAnalysis,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe cache of analyses keyed by requested URL.
pub struct AnalysisCache {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
}

impl AnalysisCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Get a fresh cached analysis.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<WebsiteAnalysis> {
        if !self.config.enabled {
            return None;
        }

        let hit = self.entries.get(url).map(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.analysis.clone())
            }
        })?;
        if hit.is_none() {
            self.entries.remove(url);
        }
        hit
    }

    /// Cache an analysis.
    pub fn insert(&self, url: &str, analysis: &WebsiteAnalysis) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        self.enforce_max_entries();
        self.entries.insert(
            url.to_string(),
            CacheEntry {
                analysis: analysis.clone(),
                expires_at: Instant::now() + Duration::from_secs(self.config.ttl_seconds),
            },
        );
    }

    /// Number of cached entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired entries.
    pub fn cleanup_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    fn enforce_max_entries(&self) {
        if self.entries.len() < self.config.max_entries {
            return;
        }
        self.cleanup_expired();

        // Still full: evict the entries closest to expiry.
        let overflow = (self.entries.len() + 1).saturating_sub(self.config.max_entries);
        if overflow > 0 {
            let mut by_expiry: Vec<(String, Instant)> = self
                .entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.expires_at))
                .collect();
            by_expiry.sort_by_key(|(_, expires_at)| *expires_at);
            for (key, _) in by_expiry.into_iter().take(overflow) {
                self.entries.remove(&key);
            }
        }
    }
}
