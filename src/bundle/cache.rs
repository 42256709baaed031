// src/bundle/cache.rs

use std::collections::HashMap;

use tracing::debug;

use crate::bundle::BuildCache;

/// Incremental build caches keyed by normalized input path.
///
/// A cache lives as long as its entry: it is replaced after every successful
/// build and evicted when the entry file is removed.
#[derive(Debug, Default)]
pub struct CacheStore {
    caches: HashMap<String, BuildCache>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, input: &str) -> Option<BuildCache> {
        self.caches.get(input).cloned()
    }

    /// Store the cache returned by the latest build. `None` clears it.
    pub fn update(&mut self, input: &str, cache: Option<BuildCache>) {
        match cache {
            Some(cache) => {
                self.caches.insert(input.to_string(), cache);
            }
            None => {
                self.caches.remove(input);
            }
        }
    }

    pub fn evict(&mut self, input: &str) -> bool {
        let removed = self.caches.remove(input).is_some();
        if removed {
            debug!(input = %input, "evicted build cache");
        }
        removed
    }

    pub fn contains(&self, input: &str) -> bool {
        self.caches.contains_key(input)
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
