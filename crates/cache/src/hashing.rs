use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use model::{EntityName, Project};
use tables::{combine_hashes, content_hash};

use crate::entry::CacheEntry;

/// Dependency-closure content hashes are themselves cached, keyed by entity
/// name alone, with the same TTL/project-version discipline as every other
/// C8 entry -- just without a third hash token to check against, since the
/// hash is exactly the thing being computed (spec §4.6, final paragraph).
pub struct HashCache {
    entries: Mutex<HashMap<EntityName, CacheEntry<u64>>>,
    ttl: Duration,
}

impl HashCache {
    pub fn new(ttl: Duration) -> Self {
        HashCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// The entity's own definition hash, combined with its parents'
    /// (recursively merged) closure hashes -- order-independent so the
    /// combination doesn't depend on traversal order (spec §4.6).
    pub fn closure_hash(&self, project: &Project, name: &EntityName, project_version: u64) -> u64 {
        {
            let entries = self.entries.lock().expect("hash cache mutex poisoned");
            if let Some(entry) = entries.get(name) {
                if entry.is_fresh(self.ttl, project_version, 0) {
                    return entry.value;
                }
            }
        }

        let own = entity_own_hash(project, name);
        let upstream: Vec<u64> = project
            .entity(name)
            .map(|e| e.static_dependencies())
            .unwrap_or_default()
            .into_iter()
            .map(|parent| self.closure_hash(project, &parent, project_version))
            .collect();
        let combined = combine_hashes(own, upstream);

        let mut entries = self.entries.lock().expect("hash cache mutex poisoned");
        entries.insert(name.clone(), CacheEntry::new(combined, project_version, 0));
        combined
    }

    pub fn invalidate(&self, entity: Option<&EntityName>) {
        let mut entries = self.entries.lock().expect("hash cache mutex poisoned");
        match entity {
            Some(name) => {
                entries.remove(name);
            }
            None => entries.clear(),
        }
    }
}

fn entity_own_hash(project: &Project, name: &EntityName) -> u64 {
    let bytes = project
        .entity(name)
        .map(|e| serde_json::to_vec(e).unwrap_or_default())
        .unwrap_or_default();
    content_hash(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(yaml: &str) -> Project {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn closure_hash_changes_when_a_parent_definition_changes() {
        let a = project(
            r#"
name: demo
entities:
  country:
    kind: fixed
    public_id: country_id
    columns: [code]
    values: [["NO"]]
  site:
    kind: fixed
    public_id: site_id
    columns: [country_code]
    values: [["NO"]]
    foreign_keys:
      - entity: country
        local_keys: [country_code]
        remote_keys: [code]
"#,
        );
        let mut b = a.clone();
        b.entities
            .get_mut(&EntityName::new("country"))
            .unwrap()
            .values = vec![vec![serde_json::json!("SE")]];

        let cache = HashCache::new(Duration::from_secs(300));
        let hash_a = cache.closure_hash(&a, &EntityName::new("site"), 1);
        let cache = HashCache::new(Duration::from_secs(300));
        let hash_b = cache.closure_hash(&b, &EntityName::new("site"), 1);
        assert_ne!(hash_a, hash_b);
    }
}
