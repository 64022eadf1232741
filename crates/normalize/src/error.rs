use model::EntityName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("project has {0} cycle(s); refusing to normalize")]
    CycleDetected(usize),

    #[error("entity {0:?} loading failed: {1}")]
    Load(EntityName, #[source] sources::SourceError),

    #[error("entity {0:?} transform failed: {1}")]
    Transform(EntityName, #[source] transform::TransformError),

    #[error("entity {entity:?}: foreign key to {parent:?} failed: {source}")]
    Link {
        entity: EntityName,
        parent: EntityName,
        #[source]
        source: identity::IdentityError,
    },

    #[error("entity {0:?}: {1}")]
    Store(EntityName, #[source] tables::StoreError),
}
