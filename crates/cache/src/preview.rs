use std::time::Instant;

use model::{EntityName, Project};
use normalize::{process_entity, EntityState};
use sources::ConnectionRegistry;
use tables::TableStore;
use tokio_util::sync::CancellationToken;

use crate::artifact::{PreviewArtifact, DEFAULT_PREVIEW_LIMIT};
use crate::error::CacheError;
use crate::key::{CacheKey, Operation};
use crate::store::Cache;

/// A bounded, single-entity run (spec §4.6): walks `target`'s ancestor
/// closure in topological order, reusing `preview_cache` for any ancestor
/// already materialized under its current hash, and only actually invoking
/// the Transform Kernel / Linker pipeline for entities that miss. Rows are
/// truncated to `limit` (default 1000) before being returned.
#[tracing::instrument(skip_all, fields(project = %project.name, entity = %target))]
pub async fn preview_entity(
    project: &Project,
    target: &EntityName,
    registry: &ConnectionRegistry,
    preview_cache: &Cache<PreviewArtifact>,
    project_version: u64,
    entity_hash: impl Fn(&EntityName) -> u64,
    limit: Option<usize>,
    cancel: CancellationToken,
) -> Result<PreviewArtifact, CacheError> {
    let limit = limit.unwrap_or(DEFAULT_PREVIEW_LIMIT);

    if !project.entities.contains_key(target) {
        return Err(CacheError::UnknownEntity(target.clone()));
    }

    let scope = ancestor_closure(project, target);
    let key = |name: &EntityName| CacheKey::new(project.name.clone(), name.clone(), Operation::Preview);

    let cached_hit = preview_cache.get(&key(target), project_version, entity_hash(target));
    if let Some(mut artifact) = cached_hit {
        artifact.cache_hit = true;
        return Ok(artifact);
    }

    let start = Instant::now();
    let store = TableStore::new(scope.clone());
    let mut applied = Vec::new();

    for name in &scope {
        let hash = entity_hash(name);
        if let Some(cached) = preview_cache.get(&key(name), project_version, hash) {
            store
                .complete(name, cached.table.clone())
                .map_err(|e| CacheError::Table(name.clone(), e))?;
            continue;
        }

        let outcome = process_entity(name.clone(), project, &store, registry, &cancel).await;
        if outcome.state != EntityState::Done {
            return Err(CacheError::EntityFailed(name.clone(), outcome.state));
        }
        applied.push(name.as_str().to_string());

        if name != target {
            let table = store
                .try_get(name)
                .expect("process_entity just completed this entity's slot")
                .clone();
            let artifact = PreviewArtifact::from_table(table, limit, false, 0, Vec::new());
            preview_cache.put(key(name), project_version, hash, artifact);
        }
    }

    let table = store
        .try_get(target)
        .expect("target entity was just processed in `scope`")
        .clone();
    let artifact = PreviewArtifact::from_table(
        table,
        limit,
        false,
        start.elapsed().as_millis() as u64,
        applied,
    );
    preview_cache.put(key(target), project_version, entity_hash(target), artifact.clone());
    Ok(artifact)
}

/// `target` plus every entity it transitively depends on, in an order safe
/// to process sequentially (parents before children). Derived from
/// `Entity::static_dependencies` directly rather than the full project
/// graph, since a preview only needs this one entity's ancestor slice.
fn ancestor_closure(project: &Project, target: &EntityName) -> Vec<EntityName> {
    let mut order = Vec::new();
    let mut visiting = std::collections::HashSet::new();
    visit(project, target, &mut visiting, &mut order);
    order
}

fn visit(
    project: &Project,
    name: &EntityName,
    visiting: &mut std::collections::HashSet<EntityName>,
    order: &mut Vec<EntityName>,
) {
    if order.contains(name) || !visiting.insert(name.clone()) {
        return;
    }
    if let Some(entity) = project.entity(name) {
        for dep in entity.static_dependencies() {
            visit(project, &dep, visiting, order);
        }
    }
    order.push(name.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(yaml: &str) -> Project {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn preview_truncates_and_reuses_parent_cache_entries() {
        let project = project(
            r#"
name: demo
entities:
  country:
    kind: fixed
    public_id: country_id
    keys: [code]
    columns: [code]
    values:
      - ["NO"]
      - ["SE"]
  site:
    kind: fixed
    public_id: site_id
    keys: [site_name]
    columns: [site_name, country_code]
    values:
      - ["Bergen", "NO"]
      - ["Lund", "SE"]
    foreign_keys:
      - entity: country
        local_keys: [country_code]
        remote_keys: [code]
        how: inner
"#,
        );
        let registry = ConnectionRegistry::default();
        let cache: Cache<PreviewArtifact> = Cache::default();

        let artifact = preview_entity(
            &project,
            &EntityName::new("site"),
            &registry,
            &cache,
            1,
            |_name| 7,
            Some(1),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(artifact.total_rows, 2);
        assert!(artifact.truncated);
        assert_eq!(artifact.table.len(), 1);
        assert!(!artifact.cache_hit);

        let second = preview_entity(
            &project,
            &EntityName::new("site"),
            &registry,
            &cache,
            1,
            |_name| 7,
            Some(1),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn unknown_entity_is_an_error() {
        let project = project("name: demo\nentities: {}\n");
        let registry = ConnectionRegistry::default();
        let cache: Cache<PreviewArtifact> = Cache::default();
        let err = preview_entity(
            &project,
            &EntityName::new("missing"),
            &registry,
            &cache,
            1,
            |_| 0,
            None,
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CacheError::UnknownEntity(_)));
    }
}
