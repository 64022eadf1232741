use std::time::{Duration, Instant};

/// Default cache lifetime (spec §4.6: "TTL = 300 s").
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// One cached artifact plus the three tokens its freshness is checked
/// against on read (spec §4.6): age, the project's version, and the
/// entity's dependency-closure content hash.
pub struct CacheEntry<T> {
    pub(crate) value: T,
    inserted_at: Instant,
    project_version: u64,
    entity_hash: u64,
}

impl<T> CacheEntry<T> {
    pub(crate) fn new(value: T, project_version: u64, entity_hash: u64) -> Self {
        CacheEntry {
            value,
            inserted_at: Instant::now(),
            project_version,
            entity_hash,
        }
    }

    /// The three-tier validation on read (spec §4.6): TTL, then project
    /// version, then entity content hash, in that order since each is
    /// progressively more expensive to have computed.
    pub(crate) fn is_fresh(&self, ttl: Duration, project_version: u64, entity_hash: u64) -> bool {
        self.inserted_at.elapsed() < ttl
            && self.project_version == project_version
            && self.entity_hash == entity_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_on_version_mismatch() {
        let entry = CacheEntry::new("x", 1, 42);
        assert!(entry.is_fresh(DEFAULT_TTL, 1, 42));
        assert!(!entry.is_fresh(DEFAULT_TTL, 2, 42));
        assert!(!entry.is_fresh(DEFAULT_TTL, 1, 7));
    }

    #[test]
    fn stale_after_ttl_elapses() {
        let entry = CacheEntry::new("x", 1, 42);
        assert!(!entry.is_fresh(Duration::from_secs(0), 1, 42));
    }
}
