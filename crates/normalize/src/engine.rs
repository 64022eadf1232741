use std::collections::HashSet;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use model::{Category, EntityName, Priority, Project, Severity, ValidationIssue};
use sources::ConnectionRegistry;
use tables::{Table, TableStore};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::NormalizeError;
use crate::result::NormalizationResult;
use crate::state::EntityState;
use crate::stats::EntityStats;

/// Worker pool width: number of available hardware threads, capped at 8
/// (spec §5). Entities are I/O-bound (DB queries, file reads), so the pool
/// is modeled as bounded *concurrency* on one async runtime rather than a
/// dedicated OS thread per worker.
fn default_pool_width() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

/// The Normalizer's (C7) single public entry point. Orders `project`'s
/// entities topologically (via C6's graph), then processes mutually
/// independent entities concurrently, bounded by a worker pool of
/// `pool_width` entities (`None` falls back to `default_pool_width()`; a
/// host sets this from its own `CoreConfig`).
#[tracing::instrument(skip_all, fields(project = %project.name))]
pub async fn normalize(
    project: &Project,
    registry: &ConnectionRegistry,
    cancel: CancellationToken,
    pool_width: Option<usize>,
) -> Result<NormalizationResult, NormalizeError> {
    let dependency_graph = graph::build(project);
    if dependency_graph.has_cycles() {
        return Err(NormalizeError::CycleDetected(dependency_graph.cycles.len()));
    }
    let order = dependency_graph
        .topo_order
        .clone()
        .expect("an acyclic graph always has a topological order");

    let store = TableStore::new(order.clone());
    let semaphore = Semaphore::new(pool_width.unwrap_or_else(default_pool_width));

    let mut states: IndexMap<EntityName, EntityState> =
        order.iter().cloned().map(|n| (n, EntityState::Pending)).collect();
    let mut stats: IndexMap<EntityName, EntityStats> = IndexMap::new();
    let mut issues = Vec::new();

    // Unique, still-outstanding parents per entity; an entity is ready once
    // this set is empty.
    let mut remaining: IndexMap<EntityName, HashSet<EntityName>> = order
        .iter()
        .map(|name| {
            let deps: HashSet<EntityName> =
                dependency_graph.nodes[name].depends_on.iter().cloned().collect();
            (name.clone(), deps)
        })
        .collect();

    let mut in_flight = FuturesUnordered::new();
    let mut stop_requested = false;

    for name in ready_entities(&remaining) {
        states.insert(name.clone(), EntityState::Loading);
        in_flight.push(spawn(name, project, &store, registry, &semaphore, &cancel));
    }
    remaining.retain(|_, deps| !deps.is_empty());

    while let Some(outcome) = in_flight.next().await {
        let failed_upstream = matches!(outcome.state, EntityState::Failed | EntityState::Cancelled);
        states.insert(outcome.name.clone(), outcome.state);
        issues.extend(outcome.issues);
        stats.insert(outcome.name.clone(), outcome.entity_stats);

        if failed_upstream && project.options.stop_on_error {
            stop_requested = true;
        }

        // Entities depending on `outcome.name` may now be ready, unless the
        // whole run is stopping or `outcome.name` didn't finish cleanly --
        // in which case they're `SKIPPED` rather than scheduled.
        let dependents: Vec<EntityName> = dependency_graph
            .dependents_of(&outcome.name)
            .into_iter()
            .cloned()
            .collect();

        for dependent in &dependents {
            if let Some(deps) = remaining.get_mut(dependent) {
                deps.remove(&outcome.name);
            }
        }

        if stop_requested || failed_upstream {
            for dependent in &dependents {
                skip_subtree(dependent, &dependency_graph, &mut states, &mut remaining, &mut stats);
            }
        }

        if stop_requested {
            continue;
        }

        let ready: Vec<EntityName> = ready_entities(&remaining);
        for name in ready {
            states.insert(name.clone(), EntityState::Loading);
            in_flight.push(spawn(name, project, &store, registry, &semaphore, &cancel));
        }
        remaining.retain(|_, deps| !deps.is_empty());
    }

    Ok(NormalizationResult {
        table_store: store,
        per_entity_stats: stats,
        issues,
    })
}

fn ready_entities(remaining: &IndexMap<EntityName, HashSet<EntityName>>) -> Vec<EntityName> {
    remaining
        .iter()
        .filter(|(_, deps)| deps.is_empty())
        .map(|(name, _)| name.clone())
        .collect()
}

/// Mark `entity` and everything transitively depending on it `SKIPPED`, and
/// stop tracking it as outstanding work for its own dependents.
fn skip_subtree(
    entity: &EntityName,
    dependency_graph: &graph::DependencyGraph,
    states: &mut IndexMap<EntityName, EntityState>,
    remaining: &mut IndexMap<EntityName, HashSet<EntityName>>,
    stats: &mut IndexMap<EntityName, EntityStats>,
) {
    if matches!(states.get(entity), Some(s) if s.is_terminal()) {
        return;
    }
    states.insert(entity.clone(), EntityState::Skipped);
    stats.insert(entity.clone(), EntityStats::new(EntityState::Skipped));
    remaining.remove(entity);

    let dependents: Vec<EntityName> = dependency_graph
        .dependents_of(entity)
        .into_iter()
        .cloned()
        .collect();
    for dependent in &dependents {
        skip_subtree(dependent, dependency_graph, states, remaining, stats);
    }
}

/// One entity's terminal processing outcome: its final state, its recorded
/// stats, and any issues the Transform Kernel or Linker surfaced along the
/// way. Also used directly by the preview path (spec §4.6), which drives
/// `process_entity` over one entity's ancestor closure rather than a whole
/// project.
pub struct EntityOutcome {
    pub name: EntityName,
    pub state: EntityState,
    pub entity_stats: EntityStats,
    pub issues: Vec<ValidationIssue>,
}

fn failure_issue(entity: &EntityName, code: &'static str, err: &NormalizeError) -> ValidationIssue {
    ValidationIssue::new(Severity::Error, Category::Data, Priority::Critical, code, err.to_string())
        .with_entity(entity.clone())
}

/// Acquires one worker-pool permit, then runs `process_entity`. Split out of
/// `process_entity` itself so the preview path (spec §4.6) can drive a
/// single entity without needing a pool at all.
async fn spawn(
    name: EntityName,
    project: &Project,
    store: &TableStore,
    registry: &ConnectionRegistry,
    semaphore: &Semaphore,
    cancel: &CancellationToken,
) -> EntityOutcome {
    let _permit = semaphore.acquire().await.expect("semaphore is never closed");
    process_entity(name, project, store, registry, cancel).await
}

/// Per-entity processing, in order (spec §4.5): load, transform (pre-link),
/// assign `system_id`, link each declared foreign key, transform (post-link),
/// publish to the `TableStore`.
pub async fn process_entity(
    name: EntityName,
    project: &Project,
    store: &TableStore,
    registry: &ConnectionRegistry,
    cancel: &CancellationToken,
) -> EntityOutcome {
    let start = Instant::now();

    let entity = project
        .entity(&name)
        .expect("entity name came from this project's own graph");

    macro_rules! cancelled {
        () => {
            return EntityOutcome {
                name,
                state: EntityState::Cancelled,
                entity_stats: EntityStats::new(EntityState::Cancelled),
                issues: Vec::new(),
            }
        };
    }

    macro_rules! fail {
        ($code:expr, $err:expr) => {{
            let issue = failure_issue(&name, $code, &$err);
            return EntityOutcome {
                name,
                state: EntityState::Failed,
                entity_stats: EntityStats::new(EntityState::Failed),
                issues: vec![issue],
            };
        }};
    }

    if cancel.is_cancelled() {
        cancelled!();
    }

    let loaded = match sources::load_entity(&name, entity, project, store, registry).await {
        Ok(table) => table,
        Err(err) => fail!("ENTITY_LOAD_FAILED", NormalizeError::Load(name.clone(), err)),
    };

    if cancel.is_cancelled() {
        cancelled!();
    }

    let (mut table, deferred) =
        match transform::pre_link(&name, entity, loaded, project, registry, store).await {
            Ok(result) => result,
            Err(err) => fail!("ENTITY_TRANSFORM_FAILED", NormalizeError::Transform(name.clone(), err)),
        };

    identity::assign_system_id(&mut table, entity);

    let mut fk_stats = Vec::new();
    let mut issues = Vec::new();

    for fk in &entity.foreign_keys {
        if cancel.is_cancelled() {
            cancelled!();
        }
        let Some(parent_entity) = project.entity(&fk.entity) else {
            fail!(
                "FK_LINK_FAILED",
                NormalizeError::Link {
                    entity: name.clone(),
                    parent: fk.entity.clone(),
                    source: identity::IdentityError::ParentNotReady(fk.entity.clone()),
                }
            );
        };
        match identity::link(&name, fk, table, parent_entity, store) {
            Ok(outcome) => {
                table = outcome.table;
                issues.extend(outcome.issues);
                fk_stats.push((fk.entity.clone(), outcome.stats));
            }
            Err(err) => fail!(
                "FK_LINK_FAILED",
                NormalizeError::Link { entity: name.clone(), parent: fk.entity.clone(), source: err }
            ),
        }
    }

    if cancel.is_cancelled() {
        cancelled!();
    }

    let table: Table = match transform::post_link(table, entity, deferred) {
        Ok(table) => table,
        Err(err) => fail!("ENTITY_TRANSFORM_FAILED", NormalizeError::Transform(name.clone(), err)),
    };

    let row_count = table.len();
    if let Err(err) = store.complete(&name, table) {
        fail!("ENTITY_STORE_FAILED", NormalizeError::Store(name.clone(), err));
    }

    EntityOutcome {
        name,
        state: EntityState::Done,
        entity_stats: EntityStats {
            state: EntityState::Done,
            row_count,
            elapsed_ms: start.elapsed().as_millis() as u64,
            fk_stats,
        },
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Project;
    use sources::ConnectionRegistry;

    fn parse(yaml: &str) -> Project {
        serde_yaml::from_str(yaml).expect("fixture project should parse")
    }

    #[tokio::test]
    async fn normalizes_a_two_entity_project_and_links_the_foreign_key() {
        let project = parse(
            r#"
name: demo
entities:
  country:
    kind: fixed
    public_id: country_id
    keys: [code]
    columns: [code, name]
    values:
      - ["NO", "Norway"]
      - ["SE", "Sweden"]
  site:
    kind: fixed
    public_id: site_id
    keys: [site_name]
    columns: [site_name, country_code]
    values:
      - ["Bergen", "NO"]
      - ["Lund", "SE"]
      - ["Orphan", "FI"]
    foreign_keys:
      - entity: country
        local_keys: [country_code]
        remote_keys: [code]
        how: left
        constraints:
          cardinality: many_to_one
"#,
        );
        let registry = ConnectionRegistry::default();
        let result = normalize(&project, &registry, CancellationToken::new(), None)
            .await
            .expect("acyclic fixed-entity project should normalize");

        assert_eq!(
            result.per_entity_stats[&EntityName::new("country")].state,
            EntityState::Done
        );
        assert_eq!(
            result.per_entity_stats[&EntityName::new("site")].state,
            EntityState::Done
        );

        let sites = result
            .table_store
            .try_get(&EntityName::new("site"))
            .expect("site table should have been published");
        assert_eq!(sites.len(), 3);
        assert!(sites
            .column_index(&model::ColumnName::new("country_id"))
            .is_some());

        // The unmatched "FI" row should surface as a warning, not abort the entity.
        assert!(result
            .issues
            .iter()
            .any(|issue| issue.code == "UNMATCHED_FK_ROW"));
    }

    #[tokio::test]
    async fn refuses_to_normalize_a_cyclic_project() {
        let project = parse(
            r#"
name: demo
entities:
  a:
    kind: fixed
    public_id: a_id
    columns: [x]
    values: [["1"]]
    depends_on: [b]
  b:
    kind: fixed
    public_id: b_id
    columns: [x]
    values: [["1"]]
    depends_on: [a]
"#,
        );
        let registry = ConnectionRegistry::default();
        let err = normalize(&project, &registry, CancellationToken::new(), None)
            .await
            .expect_err("a cyclic project must not normalize");
        assert!(matches!(err, NormalizeError::CycleDetected(_)));
    }
}
