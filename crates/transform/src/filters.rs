use model::{Entity, Filter};
use tables::{Table, TableStore};

use crate::error::TransformError;

/// Step 4: filters (spec §4.3.4). `exists_in` is the only built-in
/// predicate; it keeps rows whose `column` value also appears in
/// `entity.remote_column` of an already-materialized entity.
pub fn apply(table: Table, entity: &Entity, store: &TableStore) -> Result<Table, TransformError> {
    let mut table = table;
    for filter in &entity.filters {
        table = apply_one(table, filter, store)?;
    }
    Ok(table)
}

fn apply_one(table: Table, filter: &Filter, store: &TableStore) -> Result<Table, TransformError> {
    match filter {
        Filter::ExistsIn {
            entity,
            column,
            remote_column,
        } => {
            let remote = store
                .try_get(entity)
                .ok_or_else(|| TransformError::FilterSourceNotReady(entity.clone()))?;
            let remote_idx = remote
                .column_index(remote_column)
                .ok_or_else(|| TransformError::ColumnNotFound(remote_column.clone()))?;
            let allowed: std::collections::HashSet<String> = remote
                .rows()
                .iter()
                .map(|r| r[remote_idx].interpolate())
                .collect();

            let local_idx = table
                .column_index(column)
                .ok_or_else(|| TransformError::ColumnNotFound(column.clone()))?;

            let mut out = Table::new(table.columns().to_vec());
            for row in table.rows() {
                if allowed.contains(&row[local_idx].interpolate()) {
                    out.push_row(row.clone())?;
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ColumnName, EntityName};
    use tables::Value;

    #[test]
    fn exists_in_keeps_only_matching_rows() {
        let mut remote = Table::new(vec![ColumnName::new("code")]);
        remote.push_row(vec![Value::Text("NO".into())]).unwrap();
        let store = TableStore::new(vec![EntityName::new("country")]);
        store.complete(&EntityName::new("country"), remote).unwrap();

        let mut local = Table::new(vec![ColumnName::new("country_code")]);
        local.push_row(vec![Value::Text("NO".into())]).unwrap();
        local.push_row(vec![Value::Text("SE".into())]).unwrap();

        let entity: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: x_id\nfilters:\n  - type: exists_in\n    entity: country\n    column: country_code\n    remote_column: code\n",
        )
        .unwrap();

        let out = apply(local, &entity, &store).unwrap();
        assert_eq!(out.len(), 1);
    }
}
