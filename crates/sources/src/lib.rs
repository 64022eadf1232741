//! `sources` implements the Data Source Registry (C1) and Loader (C2): it
//! materializes one entity's source rows from its declared origin -- a SQL
//! query, a CSV/XLSX file, inline fixed values, or a shallow copy of a
//! parent entity's already-materialized table (spec §4.2).
//!
//! SQL connections are pooled per data source (C1, [`ConnectionRegistry`]);
//! transient SQL failures are retried once with backoff (spec §7). File and
//! fixed-value loaders are synchronous and cheap enough not to need either.

mod backoff;
mod csv_loader;
mod derived;
mod error;
mod fixed;
mod pool;
mod sql;
mod xlsx;

pub use error::SourceError;
pub use pool::ConnectionRegistry;

use model::{DataSourceName, Entity, EntityName, Kind, Project};
use tables::{Table, TableStore};

/// Executes a raw SQL statement against a project-declared data source.
/// Exposed for the Transform Kernel's `append: {type: sql}` step (spec
/// §4.3.2), which needs to run an ad hoc query without an `Entity` of its
/// own to dispatch on.
pub async fn query_data_source(
    ds_name: &DataSourceName,
    query: &str,
    project: &Project,
    registry: &ConnectionRegistry,
) -> Result<Table, SourceError> {
    let data_source = project
        .data_source(ds_name)
        .ok_or_else(|| SourceError::UnknownDataSource(ds_name.clone()))?;
    sql::query(ds_name, data_source, query, registry).await
}

/// Materializes `entity`'s source rows, dispatching on `entity.kind` per the
/// C2 contract table (spec §4.2). This is the only entry point the
/// Normalizer calls into this crate.
#[tracing::instrument(skip(entity, project, store, registry), fields(entity = %name, kind = ?entity.kind))]
pub async fn load_entity(
    name: &EntityName,
    entity: &Entity,
    project: &Project,
    store: &TableStore,
    registry: &ConnectionRegistry,
) -> Result<Table, SourceError> {
    match entity.kind {
        Kind::Sql => {
            backoff::retry_once(|| sql::load(name, entity, project, registry)).await
        }
        Kind::Csv => csv_loader::load(name, entity),
        Kind::Xlsx => xlsx::load(name, entity),
        Kind::Fixed => fixed::load(name, entity),
        Kind::Derived => derived::load(name, entity, store),
    }
}
