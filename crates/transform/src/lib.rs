//! `transform` is the Transform Kernel (C3, spec §4.3): the ordered sequence
//! of row-shape operations the Normalizer applies to an entity's source
//! rows, both before linking (`pre_link`: projection, append,
//! drop-duplicates/drop-empty, filters, pass-1 computed columns) and after
//! (`post_link`: pass-2 computed columns, unnest).

mod append;
mod dedup;
mod error;
mod extra_columns;
mod filters;
mod project;
mod unnest;

pub use error::TransformError;
pub use extra_columns::DeferredColumn;

use model::{Entity, EntityName, Project};
use sources::ConnectionRegistry;
use tables::{Table, TableStore};

/// Runs every Transform Kernel step that can run before the Linker sees this
/// entity's rows (spec §4.3, steps 1-5 pass 1). Returns the transformed
/// table plus any `extra_columns` entries that couldn't resolve yet because
/// they reference a column the Linker hasn't added.
#[tracing::instrument(skip_all, fields(entity = %entity_name))]
pub async fn pre_link(
    entity_name: &EntityName,
    entity: &Entity,
    source: Table,
    project: &Project,
    registry: &ConnectionRegistry,
    store: &TableStore,
) -> Result<(Table, Vec<DeferredColumn>), TransformError> {
    let table = project::project(&source, entity)?;
    let table = append::append(table, entity, project, registry).await?;
    let table = dedup::drop_duplicates(table, entity)?;
    let table = dedup::drop_empty_rows(table, entity)?;
    let mut table = filters::apply(table, entity, store)?;
    let deferred = extra_columns::pass_one(&mut table, entity)?;
    Ok((table, deferred))
}

/// Runs the remaining Transform Kernel steps after the Linker has merged
/// parent columns onto `table` (spec §4.3, steps 5 pass 2 and 6).
pub fn post_link(
    mut table: Table,
    entity: &Entity,
    deferred: Vec<DeferredColumn>,
) -> Result<Table, TransformError> {
    extra_columns::pass_two(&mut table, deferred)?;
    unnest::unnest(table, entity)
}
