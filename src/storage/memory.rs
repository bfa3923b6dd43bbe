// In-memory cache of catalog lookups for a single run
use crate::catalog::{KnownColor, SearchHit};
use crate::config::CacheConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub cached_pages: usize,
    pub cached_searches: usize,
    pub last_updated: SystemTime,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self {
            cached_pages: 0,
            cached_searches: 0,
            last_updated: SystemTime::now(),
            cache_hits: 0,
            cache_misses: 0,
        }
    }
}

/// Parsed catalog responses keyed by item number and by search query.
///
/// Several local models often resolve to the same catalog item (or issue the
/// same query), so each is fetched once per run.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    // item_no (lower-case) -> (colors, timestamp)
    pages: HashMap<String, (Vec<KnownColor>, SystemTime)>,
    // query -> (hits, timestamp)
    searches: HashMap<String, (Vec<SearchHit>, SystemTime)>,

    metadata: CacheMetadata,

    max_entries: Option<usize>,
    cache_ttl_seconds: u64,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            searches: HashMap::new(),
            metadata: CacheMetadata::default(),
            max_entries: None,
            cache_ttl_seconds: 3600,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        let cache = Self::new().with_cache_ttl(config.ttl_seconds);
        match config.max_entries {
            Some(max_entries) => cache.with_max_entries(max_entries),
            None => cache,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    pub fn with_cache_ttl(mut self, ttl_seconds: u64) -> Self {
        self.cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Known colors of a catalog item, if fetched recently
    pub fn get_page(&mut self, item_no: &str) -> Option<Vec<KnownColor>> {
        let ttl = self.cache_ttl_seconds;
        let found = self
            .pages
            .get(&item_no.to_lowercase())
            .filter(|(_, timestamp)| is_fresh(timestamp, ttl))
            .map(|(colors, _)| colors.clone());
        self.record(found.is_some());
        found
    }

    pub fn put_page(&mut self, item_no: &str, colors: Vec<KnownColor>) {
        if self.is_full() {
            return;
        }
        self.pages
            .insert(item_no.to_lowercase(), (colors, SystemTime::now()));
        self.update_metadata();
    }

    /// Parsed hits of a search query, if run recently
    pub fn get_search(&mut self, query: &str) -> Option<Vec<SearchHit>> {
        let ttl = self.cache_ttl_seconds;
        let found = self
            .searches
            .get(query)
            .filter(|(_, timestamp)| is_fresh(timestamp, ttl))
            .map(|(hits, _)| hits.clone());
        self.record(found.is_some());
        found
    }

    pub fn put_search(&mut self, query: &str, hits: Vec<SearchHit>) {
        if self.is_full() {
            return;
        }
        self.searches
            .insert(query.to_string(), (hits, SystemTime::now()));
        self.update_metadata();
    }

    pub fn get_metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.pages.len() + self.searches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.searches.clear();
        self.update_metadata();
    }

    // Private helper methods

    fn is_full(&self) -> bool {
        self.max_entries.map_or(false, |max| self.len() >= max)
    }

    fn record(&mut self, hit: bool) {
        if hit {
            self.metadata.cache_hits += 1;
        } else {
            self.metadata.cache_misses += 1;
        }
    }

    fn update_metadata(&mut self) {
        self.metadata.cached_pages = self.pages.len();
        self.metadata.cached_searches = self.searches.len();
        self.metadata.last_updated = SystemTime::now();
    }
}

fn is_fresh(timestamp: &SystemTime, ttl_seconds: u64) -> bool {
    timestamp.elapsed().unwrap_or_default().as_secs() < ttl_seconds
}
