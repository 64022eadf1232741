//! `normalize` is the Normalizer (C7, spec §4.5): it drives every other
//! engine crate through one project's per-entity state machine --
//! `PENDING -> LOADING -> TRANSFORMING_PRE -> LINKING -> TRANSFORMING_POST ->
//! DONE` -- processing mutually independent entities concurrently, bounded by
//! a worker pool sized from the host's hardware concurrency (spec §5).

mod engine;
mod error;
mod result;
mod state;
mod stats;

pub use engine::{normalize, process_entity, EntityOutcome};
pub use error::NormalizeError;
pub use result::NormalizationResult;
pub use state::EntityState;
pub use stats::EntityStats;
