use identity::FkStats;
use model::EntityName;

use crate::state::EntityState;

/// The outcome the Normalizer records for one entity, surfaced to the
/// validation and preview subsystems (spec §4.4, final paragraph; §4.5).
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityStats {
    pub state: EntityState,
    pub row_count: usize,
    pub elapsed_ms: u64,
    /// One entry per declared foreign key, in declaration order.
    pub fk_stats: Vec<(EntityName, FkStats)>,
}

impl EntityStats {
    pub fn new(state: EntityState) -> Self {
        EntityStats {
            state,
            row_count: 0,
            elapsed_ms: 0,
            fk_stats: Vec::new(),
        }
    }
}
