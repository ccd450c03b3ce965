//! Process-wide cache of compiled paths
//!
//! Query and sort paths repeat across requests, so each distinct path string is
//! compiled once. The cache is cleared when it reaches its capacity.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::segments::SegmentPath;
use crate::errors::RegistryResult;

pub const DEFAULT_CAPACITY: usize = 1024;

static GLOBAL: Lazy<PathCache> = Lazy::new(|| PathCache::new(DEFAULT_CAPACITY));

#[derive(Debug)]
pub struct PathCache {
    capacity: AtomicUsize,
    entries: RwLock<HashMap<String, Arc<SegmentPath>>>,
}

impl PathCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: AtomicUsize::new(capacity.max(1)),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn global() -> &'static PathCache {
        &GLOBAL
    }

    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity.max(1), Ordering::Relaxed);
    }

    /// Returns the compiled path, compiling and caching it on first use.
    ///
    /// Paths that fail to compile are not cached.
    pub fn resolve(&self, path: &str) -> RegistryResult<Arc<SegmentPath>> {
        if let Ok(entries) = self.entries.read() {
            if let Some(compiled) = entries.get(path) {
                return Ok(Arc::clone(compiled));
            }
        }

        let compiled = Arc::new(SegmentPath::parse(path)?);

        // A poisoned cache only costs a recompile on the next lookup
        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.capacity.load(Ordering::Relaxed) {
                entries.clear();
            }
            entries.insert(path.to_string(), Arc::clone(&compiled));
        }

        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_shares_compiled_path() {
        let cache = PathCache::new(8);
        let first = cache.resolve("submodelDescriptors.idShort").unwrap();
        let second = cache.resolve("submodelDescriptors.idShort").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failures_not_cached() {
        let cache = PathCache::new(8);
        assert!(cache.resolve("unknown.field").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleared_at_capacity() {
        let cache = PathCache::new(2);
        cache.resolve("id").unwrap();
        cache.resolve("idShort").unwrap();
        cache.resolve("assetType").unwrap();

        assert_eq!(cache.len(), 1);
    }
}
