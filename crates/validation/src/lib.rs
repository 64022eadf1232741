//! `validation` is the Validation Engine (C9, spec §4.7): a configurable
//! bundle of structural and data validators that run against a project (and,
//! for data validators, a completed normalization of it), emitting
//! severity-tagged [`model::ValidationIssue`]s.

mod data;
mod error;
mod mode;
mod structural;

pub use error::ValidationError;
pub use mode::ValidationMode;

use model::{Project, ValidationIssue};
use sources::ConnectionRegistry;
use tokio_util::sync::CancellationToken;

/// Runs every validator belonging to `mode` against `project`. `Structural`
/// never touches `registry`; the two data modes drive the Normalizer first
/// (spec §4.7 "requires the Normalizer") and validate its output.
///
/// Both data modes currently run the Normalizer over the full project --
/// `sources` has no row-limited query path to bound `DataSample` to a
/// preview-sized input, so the distinction is preserved at the API surface
/// (and in cache keys, spec §4.6) without yet changing what actually runs.
#[tracing::instrument(skip_all, fields(project = %project.name, mode = ?mode))]
pub async fn validate(
    project: &Project,
    mode: ValidationMode,
    registry: &ConnectionRegistry,
    cancel: CancellationToken,
) -> Result<Vec<ValidationIssue>, ValidationError> {
    if cancel.is_cancelled() {
        return Err(ValidationError::Cancelled);
    }

    if mode.is_structural() {
        return Ok(structural::run(project));
    }

    let result = normalize::normalize(project, registry, cancel, None).await?;
    let mut issues = result.issues;
    issues.extend(data::run(project, &result.table_store, &result.per_entity_stats));
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::EntityName;

    fn project(yaml: &str) -> Project {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn structural_mode_flags_a_bad_public_id_and_a_missing_parent() {
        let project = project(
            r#"
name: demo
entities:
  site:
    kind: fixed
    public_id: site
    columns: [name]
    values: [["Bergen"]]
    foreign_keys:
      - entity: country
        local_keys: [name]
        remote_keys: [code]
"#,
        );
        let registry = ConnectionRegistry::default();
        let issues = validate(&project, ValidationMode::Structural, &registry, CancellationToken::new())
            .await
            .unwrap();

        assert!(issues.iter().any(|i| i.code == "PUBLIC_ID_NAMING_CONVENTION"));
        assert!(issues.iter().any(|i| i.code == "MISSING_PARENT"));
    }

    #[tokio::test]
    async fn structural_mode_refuses_nothing_on_a_clean_project() {
        let project = project(
            r#"
name: demo
entities:
  country:
    kind: fixed
    public_id: country_id
    keys: [code]
    columns: [code]
    values: [["NO"]]
"#,
        );
        let registry = ConnectionRegistry::default();
        let issues = validate(&project, ValidationMode::Structural, &registry, CancellationToken::new())
            .await
            .unwrap();
        assert!(issues.is_empty());
    }

    #[tokio::test]
    async fn data_complete_mode_flags_low_fk_match_rate() {
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
  site:
    kind: fixed
    public_id: site_id
    keys: [site_name]
    columns: [site_name, country_code]
    values:
      - ["Bergen", "NO"]
      - ["Lund", "SE"]
      - ["Oslo", "FI"]
    foreign_keys:
      - entity: country
        local_keys: [country_code]
        remote_keys: [code]
        how: left
"#,
        );
        let registry = ConnectionRegistry::default();
        let issues = validate(&project, ValidationMode::DataComplete, &registry, CancellationToken::new())
            .await
            .unwrap();

        assert!(issues.iter().any(|i| i.code == "FK_MATCH_RATE_LOW"
            && i.entity == Some(EntityName::new("site"))
            && i.severity == model::Severity::Error));
    }

    #[tokio::test]
    async fn cancelled_before_start_is_an_error() {
        let project = project("name: demo\nentities: {}\n");
        let registry = ConnectionRegistry::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = validate(&project, ValidationMode::Structural, &registry, cancel).await.unwrap_err();
        assert!(matches!(err, ValidationError::Cancelled));
    }
}
