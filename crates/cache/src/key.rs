use model::EntityName;

/// Which C8 operation produced a cached artifact (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Preview,
    Sample,
    ValidateStructural,
    ValidateDataSample,
    ValidateDataComplete,
}

/// `(project_name, entity_name, operation)` (spec §4.6).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub project: String,
    pub entity: EntityName,
    pub operation: Operation,
}

impl CacheKey {
    pub fn new(project: impl Into<String>, entity: EntityName, operation: Operation) -> Self {
        CacheKey {
            project: project.into(),
            entity,
            operation,
        }
    }
}
