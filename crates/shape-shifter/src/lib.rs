//! `shape-shifter` is the core's facade (spec §6): the small set of free
//! functions a host (CLI, service, editor plugin) calls to drive the
//! Dependency Graph Service, the Normalizer, the Preview/Validation Cache,
//! and the Validation Engine, without wiring those crates together itself.

mod context;
mod error;

pub use context::{CoreConfig, RunContext};
pub use error::CoreError;

use model::{EntityName, Project, ValidationIssue};

/// Per-call overrides for [`normalize`]; `ctx`'s [`CoreConfig`] supplies the
/// defaults. Kept as its own type (spec §6: `normalize(project, options,
/// ctx)`) rather than folding the override into `RunContext` so a caller can
/// run one project at a narrower pool width without rebuilding its context.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOptions {
    pub pool_width: Option<usize>,
}

/// C6: a project's dependency graph, rebuilt fresh on every call (spec §6 --
/// building it is cheap enough that the facade never caches it itself).
pub fn build_graph(project: &Project) -> graph::DependencyGraph {
    graph::build(project)
}

/// The cycles in `project`'s dependency graph, if any (spec §6).
pub fn detect_cycles(project: &Project) -> Vec<graph::Cycle> {
    graph::build(project).cycles.clone()
}

/// C7: runs the Normalizer end to end. `options.pool_width` overrides
/// `ctx`'s configured worker-pool width for this call only.
#[tracing::instrument(skip_all, fields(project = %project.name))]
pub async fn normalize(
    project: &Project,
    options: NormalizeOptions,
    ctx: &RunContext,
) -> Result<normalize::NormalizationResult, CoreError> {
    let pool_width = options.pool_width.or(ctx.config.worker_pool_width);
    let result = normalize::normalize(project, &ctx.registry, ctx.cancellation_token(), pool_width).await?;
    Ok(result)
}

/// C8: a bounded, single-entity preview, reusing `ctx`'s cache for any
/// ancestor already materialized under its current content hash.
#[tracing::instrument(skip_all, fields(project = %project.name, entity = %entity))]
pub async fn preview_entity(
    project: &Project,
    entity: &EntityName,
    limit: usize,
    ctx: &RunContext,
) -> Result<cache::PreviewArtifact, CoreError> {
    let project_version = project.version;
    let entity_hash = |name: &EntityName| ctx.hash_cache.closure_hash(project, name, project_version);
    let artifact = cache::preview_entity(
        project,
        entity,
        &ctx.registry,
        &ctx.preview_cache,
        project_version,
        entity_hash,
        Some(limit),
        ctx.cancellation_token(),
    )
    .await?;
    Ok(artifact)
}

/// The project-wide cache key entity used for validation artifacts, which
/// aren't scoped to a single entity the way previews are.
const PROJECT_SCOPE: &str = "__project__";

/// C9: runs `mode`'s validator bundle against `project`, transparently
/// cached per mode in C8 (spec §4.6, §4.7). The spec's conceptual signature
/// returns a plain issue list with no error case -- a run that can't even
/// start (cancelled, or a failed Normalizer run for a data mode) is folded
/// into a single synthetic issue rather than propagated, matching "all
/// failures are returned as ValidationIssues where expected" (spec §7).
#[tracing::instrument(skip_all, fields(project = %project.name, mode = ?mode))]
pub async fn validate(
    project: &Project,
    mode: validation::ValidationMode,
    ctx: &RunContext,
) -> Vec<ValidationIssue> {
    let operation = match mode {
        validation::ValidationMode::Structural => cache::Operation::ValidateStructural,
        validation::ValidationMode::DataSample => cache::Operation::ValidateDataSample,
        validation::ValidationMode::DataComplete => cache::Operation::ValidateDataComplete,
    };
    let key = cache::CacheKey::new(project.name.clone(), EntityName::new(PROJECT_SCOPE), operation);
    let project_hash = tables::content_hash(&serde_json::to_vec(project).unwrap_or_default());

    if let Some(cached) = ctx.validation_cache.get(&key, project.version, project_hash) {
        return cached;
    }

    let issues = match validation::validate(project, mode, &ctx.registry, ctx.cancellation_token()).await {
        Ok(issues) => issues,
        Err(err) => vec![validation_error_to_issue(&err)],
    };
    ctx.validation_cache.put(key, project.version, project_hash, issues.clone());
    issues
}

fn validation_error_to_issue(err: &validation::ValidationError) -> ValidationIssue {
    let code = match err {
        validation::ValidationError::Cancelled => "CANCELLED",
        validation::ValidationError::Normalize(_) => "LOAD_ERROR",
    };
    model::ValidationIssue::new(
        model::Severity::Error,
        model::Category::Structural,
        model::Priority::Critical,
        code,
        err.to_string(),
    )
}

/// Flushes C8 entries for `project_name` (and, if `entity` is given, only
/// that entity's closure) from both artifact caches and the hash cache
/// (spec §4.6, §6).
pub fn invalidate_cache(ctx: &RunContext, project_name: &str, entity: Option<&EntityName>) {
    ctx.invalidate_cache(project_name, entity);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(yaml: &str) -> Project {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn sample_project() -> Project {
        project(
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
        )
    }

    #[test]
    fn build_graph_orders_site_after_country() {
        let project = sample_project();
        let graph = build_graph(&project);
        assert!(!graph.has_cycles());
        let order = graph.topo_order.clone().unwrap();
        let country_pos = order.iter().position(|n| n == &EntityName::new("country")).unwrap();
        let site_pos = order.iter().position(|n| n == &EntityName::new("site")).unwrap();
        assert!(country_pos < site_pos);
    }

    #[tokio::test]
    async fn normalize_runs_the_full_project() {
        let project = sample_project();
        let ctx = RunContext::default();
        let result = normalize(&project, NormalizeOptions::default(), &ctx).await.unwrap();
        assert_eq!(result.per_entity_stats.len(), 2);
    }

    #[tokio::test]
    async fn preview_entity_caches_across_calls() {
        let project = sample_project();
        let ctx = RunContext::default();
        let entity = EntityName::new("site");

        let first = preview_entity(&project, &entity, 10, &ctx).await.unwrap();
        assert!(!first.cache_hit);
        let second = preview_entity(&project, &entity, 10, &ctx).await.unwrap();
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn validate_caches_the_issue_list_per_mode() {
        let project = sample_project();
        let ctx = RunContext::default();

        let first = validate(&project, validation::ValidationMode::Structural, &ctx).await;
        assert!(first.is_empty());
        assert_eq!(ctx.validation_cache.len(), 1);
        let second = validate(&project, validation::ValidationMode::Structural, &ctx).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn invalidate_cache_clears_a_previewed_entity() {
        let project = sample_project();
        let ctx = RunContext::default();
        let entity = EntityName::new("site");

        preview_entity(&project, &entity, 10, &ctx).await.unwrap();
        assert_eq!(ctx.preview_cache.len(), 2); // country (ancestor) + site

        invalidate_cache(&ctx, "demo", Some(&entity));
        assert_eq!(ctx.preview_cache.len(), 1);
    }
}
