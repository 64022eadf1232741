use model::{Append, ColumnName, Entity, Project};
use sources::ConnectionRegistry;
use tables::{Table, Value};

use crate::error::TransformError;

/// Step 2: append (spec §4.3.2). Runs before business-key deduplication, so
/// appended rows participate in `drop_duplicates` like any other row.
/// `Append::Fixed` rows are positional against the table's current (already
/// projected) column order; `Append::Sql` rows are aligned by name, with any
/// column the query didn't return filled with `null`.
pub async fn append(
    mut table: Table,
    entity: &Entity,
    project: &Project,
    registry: &ConnectionRegistry,
) -> Result<Table, TransformError> {
    for step in &entity.append {
        let extra = match step {
            Append::Fixed { values } => fixed_rows(&table, values)?,
            Append::Sql { data_source, query } => {
                let raw = sources::query_data_source(data_source, query, project, registry).await?;
                align_by_name(table.columns(), &raw)
            }
        };
        for row in extra.rows() {
            table.push_row(row.clone())?;
        }
    }
    Ok(table)
}

fn fixed_rows(table: &Table, values: &[Vec<serde_json::Value>]) -> Result<Table, TransformError> {
    let mut out = Table::new(table.columns().to_vec());
    for row in values {
        let values: Vec<Value> = row.iter().map(Value::from_json).collect();
        out.push_row(values)?;
    }
    Ok(out)
}

fn align_by_name(target_columns: &[ColumnName], source: &Table) -> Table {
    let mut out = Table::new(target_columns.to_vec());
    for row in source.rows() {
        let aligned: Vec<Value> = target_columns
            .iter()
            .map(|col| {
                source
                    .column_index(col)
                    .map(|i| row[i].clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        // Infallible: `aligned.len() == target_columns.len()` by construction.
        let _ = out.push_row(aligned);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnName;

    #[test]
    fn aligns_by_name_and_fills_missing_with_null() {
        let mut source = Table::new(vec![ColumnName::new("b"), ColumnName::new("c")]);
        source
            .push_row(vec![Value::Text("B".into()), Value::Text("C".into())])
            .unwrap();

        let target = vec![ColumnName::new("a"), ColumnName::new("b")];
        let aligned = align_by_name(&target, &source);
        assert_eq!(aligned.rows()[0], vec![Value::Null, Value::Text("B".into())]);
    }
}
