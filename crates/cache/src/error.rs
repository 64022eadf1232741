use model::EntityName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("entity {0:?} is not declared in this project")]
    UnknownEntity(EntityName),

    #[error("entity {0:?} did not reach DONE during preview execution ({1:?})")]
    EntityFailed(EntityName, normalize::EntityState),

    #[error("entity {0:?}: {1}")]
    Table(EntityName, #[source] tables::StoreError),
}
