use model::{ColumnName, EntityName};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentityError {
    #[error("parent entity {0:?} has not finished processing")]
    ParentNotReady(EntityName),

    #[error("entity {entity:?}: column {column:?} referenced by a foreign key does not exist")]
    ColumnNotFound {
        entity: EntityName,
        column: ColumnName,
    },

    #[error(
        "entity {entity:?}: foreign key to {parent:?} requires unique {side} keys, but {count} row(s) share a key"
    )]
    UniqueConstraintViolation {
        entity: EntityName,
        parent: EntityName,
        side: &'static str,
        count: usize,
    },

    #[error("table error: {0}")]
    Table(#[from] tables::TableError),
}
