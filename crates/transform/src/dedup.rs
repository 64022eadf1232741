use model::{ColumnName, ColumnSelector, Entity};
use tables::{Table, Value};

use crate::error::TransformError;

fn resolve_columns(selector: &ColumnSelector, entity: &Entity) -> Option<Vec<ColumnName>> {
    match selector {
        ColumnSelector::Disabled => None,
        ColumnSelector::Default => Some(entity.keys.clone()),
        ColumnSelector::Columns(cols) => Some(cols.clone()),
    }
}

fn column_indices(table: &Table, columns: &[ColumnName]) -> Result<Vec<usize>, TransformError> {
    columns
        .iter()
        .map(|c| {
            table
                .column_index(c)
                .ok_or_else(|| TransformError::ColumnNotFound(c.clone()))
        })
        .collect()
}

/// Step 3a: drop-duplicates (spec §4.3.3). When enabled, keeps the first row
/// of each distinct tuple over the resolved columns (`keys`, by default) and
/// drops the rest.
pub fn drop_duplicates(table: Table, entity: &Entity) -> Result<Table, TransformError> {
    let Some(columns) = resolve_columns(&entity.drop_duplicates, entity) else {
        return Ok(table);
    };
    let indices = column_indices(&table, &columns)?;

    let mut seen = std::collections::HashSet::new();
    let mut out = Table::new(table.columns().to_vec());
    for row in table.rows() {
        let key: Vec<String> = indices.iter().map(|&i| row[i].interpolate()).collect();
        if seen.insert(key) {
            out.push_row(row.clone())?;
        }
    }
    Ok(out)
}

/// Step 3b: drop-empty-rows (spec §4.3.3). A row is "empty" when every
/// resolved column holds `null` or an empty string.
pub fn drop_empty_rows(table: Table, entity: &Entity) -> Result<Table, TransformError> {
    let Some(columns) = resolve_columns(&entity.drop_empty_rows, entity) else {
        return Ok(table);
    };
    let indices = column_indices(&table, &columns)?;

    let mut out = Table::new(table.columns().to_vec());
    for row in table.rows() {
        let empty = indices
            .iter()
            .all(|&i| matches!(&row[i], Value::Null) || row[i].interpolate().is_empty());
        if !empty {
            out.push_row(row.clone())?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(yaml: &str) -> Entity {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn drops_duplicate_keys_keeping_the_first() {
        let mut t = Table::new(vec![ColumnName::new("k"), ColumnName::new("v")]);
        t.push_row(vec![Value::Int(1), Value::Text("first".into())]).unwrap();
        t.push_row(vec![Value::Int(1), Value::Text("second".into())]).unwrap();
        t.push_row(vec![Value::Int(2), Value::Text("third".into())]).unwrap();

        let e = entity("kind: fixed\npublic_id: x_id\nkeys: [k]\ndrop_duplicates: true\n");
        let out = drop_duplicates(t, &e).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0][1], Value::Text("first".into()));
    }

    #[test]
    fn drop_empty_rows_disabled_by_default() {
        let mut t = Table::new(vec![ColumnName::new("k")]);
        t.push_row(vec![Value::Null]).unwrap();
        let e = entity("kind: fixed\npublic_id: x_id\n");
        let out = drop_empty_rows(t, &e).unwrap();
        assert_eq!(out.len(), 1);
    }
}
