use model::ColumnName;

#[derive(thiserror::Error, Debug)]
pub enum TransformError {
    #[error("column {0:?} not found")]
    ColumnNotFound(ColumnName),

    #[error("computed column {0:?} could not be resolved even after linking")]
    UnresolvedComputedColumn(ColumnName),

    #[error("filter references entity {0:?}, which has not finished processing")]
    FilterSourceNotReady(model::EntityName),

    #[error(transparent)]
    Load(#[from] sources::SourceError),

    #[error(transparent)]
    Table(#[from] tables::TableError),
}
