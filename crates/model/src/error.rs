use crate::names::EntityName;
use thiserror::Error;

/// `ConfigurationError` (spec §7): malformed project definition detectable
/// without touching data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("entity {entity:?} is referenced but not defined in this project")]
    MissingParent { entity: EntityName },

    #[error("entity {entity:?} column {column:?} is referenced by {by} before it can exist")]
    UnknownColumn {
        entity: EntityName,
        column: String,
        by: &'static str,
    },

    #[error("entity {entity:?} public_id {public_id:?} does not end in `_id`")]
    InvalidPublicId { entity: EntityName, public_id: String },

    #[error("entity {entity:?} kind {kind:?} requires field {field}")]
    MissingField {
        entity: EntityName,
        kind: &'static str,
        field: &'static str,
    },

    #[error("task_list is not a topological extension of the implicit dependency graph: {detail}")]
    InvalidTaskList { detail: String },
}
