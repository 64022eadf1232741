use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::entry::{CacheEntry, DEFAULT_TTL};
use crate::key::CacheKey;

/// C8, the Preview/Validation Cache (spec §4.6): a keyed store of artifacts
/// (`T`), validated on read against a TTL, the project's version token, and
/// the entity's dependency-closure content hash. One `Cache<T>` instance
/// holds one artifact shape -- callers keep a `Cache<PreviewArtifact>` and a
/// `Cache<ValidationArtifact>` side by side rather than mixing shapes behind
/// an enum, following the single-responsibility-per-map style of this
/// workspace's other process-local stores.
pub struct Cache<T> {
    entries: Mutex<HashMap<CacheKey, CacheEntry<T>>>,
    ttl: Duration,
}

impl<T> Default for Cache<T> {
    fn default() -> Self {
        Cache {
            entries: Mutex::new(HashMap::new()),
            ttl: DEFAULT_TTL,
        }
    }
}

impl<T: Clone> Cache<T> {
    pub fn with_ttl(ttl: Duration) -> Self {
        Cache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the cached artifact for `key` iff it passes all three
    /// validation tiers; otherwise evicts it (if present) and returns
    /// `None`, the cache-miss path (spec §4.6).
    pub fn get(&self, key: &CacheKey, project_version: u64, entity_hash: u64) -> Option<T> {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.is_fresh(self.ttl, project_version, entity_hash) => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Always overwrites (spec §4.6: "Write: always writes").
    pub fn put(&self, key: CacheKey, project_version: u64, entity_hash: u64, value: T) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(key, CacheEntry::new(value, project_version, entity_hash));
    }

    /// Flush entries for `(project_name, entity_name?)` (spec §4.6). A
    /// `None` entity flushes every entry for that project.
    pub fn invalidate(&self, project: &str, entity: Option<&model::EntityName>) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.retain(|key, _| {
            if key.project != project {
                return true;
            }
            match entity {
                Some(name) => key.entity != *name,
                None => false,
            }
        });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Operation;
    use model::EntityName;

    fn key() -> CacheKey {
        CacheKey::new("demo", EntityName::new("site"), Operation::Preview)
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache: Cache<u32> = Cache::default();
        cache.put(key(), 1, 42, 7);
        assert_eq!(cache.get(&key(), 1, 42), Some(7));
    }

    #[test]
    fn stale_on_hash_mismatch_and_evicts() {
        let cache: Cache<u32> = Cache::default();
        cache.put(key(), 1, 42, 7);
        assert_eq!(cache.get(&key(), 1, 99), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_flushes_matching_entity_only() {
        let cache: Cache<u32> = Cache::default();
        cache.put(key(), 1, 42, 7);
        let other = CacheKey::new("demo", EntityName::new("country"), Operation::Preview);
        cache.put(other.clone(), 1, 1, 1);

        cache.invalidate("demo", Some(&EntityName::new("site")));
        assert_eq!(cache.get(&key(), 1, 42), None);
        assert_eq!(cache.get(&other, 1, 1), Some(1));
    }
}
