use model::{DataSourceName, EntityName};

/// Failures from C1 (connection acquisition) or C2 (materializing an
/// entity's source rows). Every variant here becomes a `LOAD_ERROR`
/// validation issue at the entity level (spec §4.2, §7); only
/// [`SourceError::is_transient`] variants are retried, and then only once.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("data source {0:?} is not declared in this project")]
    UnknownDataSource(DataSourceName),

    #[error("entity {0:?} declares kind=sql but no data_source")]
    MissingDataSource(EntityName),

    #[error("entity {0:?} declares kind=sql but neither query nor table")]
    MissingQueryOrTable(EntityName),

    #[error("entity {0:?} declares kind={1} but no filename in options")]
    MissingFilename(EntityName, &'static str),

    #[error("entity {0:?} declares kind=derived but `source` is not set")]
    MissingSource(EntityName),

    #[error("connection pool for data source {0:?} could not be established: {1}")]
    Connection(DataSourceName, String),

    #[error("query against data source {0:?} failed: {1}")]
    Query(DataSourceName, #[source] sqlx::Error),

    #[error("ODBC query against data source {0:?} failed: {1}")]
    Odbc(DataSourceName, String),

    #[error("failed to read file {0:?}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("failed to parse CSV file {0:?}: {1}")]
    Csv(String, #[source] csv::Error),

    #[error("failed to read workbook {0:?}: {1}")]
    Xlsx(String, String),

    #[error("sheet {sheet:?} not found in workbook {file:?}")]
    SheetNotFound { file: String, sheet: String },

    #[error("fixed entity {0:?} declares {1} values per row but has {2} columns")]
    FixedRowShape(EntityName, usize, usize),

    #[error("derived entity {0:?}'s source {1:?} has not been materialized yet")]
    SourceNotReady(EntityName, EntityName),

    #[error(transparent)]
    Table(#[from] tables::TableError),
}

impl SourceError {
    /// Transient failures -- connection/timeout errors against a SQL data
    /// source -- are retried once with backoff (spec §7: "Retried once with
    /// backoff for transient SQL failures; other failures are not
    /// retried."). Parse errors, missing files, and bad SQL syntax are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Connection(..)
                | SourceError::Query(_, sqlx::Error::PoolTimedOut)
                | SourceError::Query(_, sqlx::Error::Io(_))
        )
    }
}
