use crate::datasource::DataSource;
use crate::entity::Entity;
use crate::names::{DataSourceName, EntityName};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global options that apply across a project's entities.
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Options {
    /// Stop the whole run on the first entity failure, rather than marking
    /// descendants `SKIPPED` (spec §4.5, §7).
    #[serde(default)]
    pub stop_on_error: bool,
}

/// A named bundle of data sources and entity definitions. Carries a monotone
/// version token (Invariant: bumped whenever persisted state mutates) used by
/// the cache's three-tier validation (spec §4.6, §3.2.8).
#[derive(Serialize, Deserialize, Debug, Clone, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Project {
    pub name: String,

    /// Monotone version token. Bumped on every save; pinned for the duration
    /// of a run (spec §5, "Project definition: immutable for the duration of
    /// a run").
    #[serde(default)]
    pub version: u64,

    #[serde(default)]
    pub data_sources: BTreeMap<DataSourceName, DataSource>,

    pub entities: BTreeMap<EntityName, Entity>,

    #[serde(default)]
    pub options: Options,

    /// Optional explicit processing order. When present, must be a
    /// topological extension of the implicit graph (spec §6.1).
    #[serde(default)]
    pub task_list: Option<Vec<EntityName>>,

    /// `reconciliation` is recognized but ignored by the core (spec §6.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconciliation: Option<serde_json::Value>,
}

impl Project {
    pub fn entity(&self, name: &EntityName) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn data_source(&self, name: &DataSourceName) -> Option<&DataSource> {
        self.data_sources.get(name)
    }
}

/// A monotonically-increasing, process-local counter used by host code to
/// hand the core a fresh version token when a project is mutated. The core
/// itself never advances the token -- it only ever reads it (spec: "the core
/// receives the parsed in-memory object").
#[derive(Debug, Default)]
pub struct VersionSource(AtomicU64);

impl VersionSource {
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_project() {
        let yaml = r#"
name: demo
entities:
  location:
    kind: fixed
    public_id: location_id
    keys: [location_name]
    columns: [location_name, country_code]
    values:
      - ["Norway", "NO"]
      - ["Sweden", "SE"]
"#;
        let project: Project = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(project.name, "demo");
        assert!(project.entities.contains_key(&EntityName::new("location")));
    }
}
