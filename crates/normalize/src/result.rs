use indexmap::IndexMap;
use model::{EntityName, ValidationIssue};
use tables::TableStore;

use crate::stats::EntityStats;

/// The Normalizer's (C7) single public return value: `normalize(project) ->
/// NormalizationResult` (spec §4.5).
pub struct NormalizationResult {
    pub table_store: TableStore,
    pub per_entity_stats: IndexMap<EntityName, EntityStats>,
    pub issues: Vec<ValidationIssue>,
}
