//! `cache` is the Preview/Validation Cache (C8, spec §4.6): a keyed,
//! three-tier-validated store of preview and validation artifacts, plus the
//! bounded single-entity preview execution that produces them.

mod artifact;
mod entry;
mod error;
mod hashing;
mod key;
mod preview;
mod store;

pub use artifact::{ColumnMeta, PreviewArtifact, ValidationArtifact, DEFAULT_PREVIEW_LIMIT};
pub use entry::DEFAULT_TTL;
pub use error::CacheError;
pub use hashing::HashCache;
pub use key::{CacheKey, Operation};
pub use preview::preview_entity;
pub use store::Cache;
