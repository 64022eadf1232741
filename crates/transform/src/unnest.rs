use model::{ColumnName, Entity};
use tables::{Table, Value};

use crate::error::TransformError;

/// Step 6 (spec §4.3.6): wide-to-long melt. `id_vars` are preserved as-is;
/// each `value_vars` column becomes one row per (id, var, value) triple.
/// Business-key columns that are also `value_vars` are promoted into
/// `id_vars` so the melted rows keep their identity.
pub fn unnest(table: Table, entity: &Entity) -> Result<Table, TransformError> {
    let Some(cfg) = &entity.unnest else {
        return Ok(table);
    };

    let mut id_vars = cfg.id_vars.clone();
    for key in &entity.keys {
        if cfg.value_vars.contains(key) && !id_vars.contains(key) {
            id_vars.push(key.clone());
        }
    }

    let id_indices = column_indices(&table, &id_vars)?;
    let value_indices = column_indices(&table, &cfg.value_vars)?;

    let mut out_columns = id_vars.clone();
    out_columns.push(cfg.var_name.clone());
    out_columns.push(cfg.value_name.clone());
    let mut out = Table::new(out_columns);

    for row in table.rows() {
        for (value_var, &v_idx) in cfg.value_vars.iter().zip(value_indices.iter()) {
            let mut new_row: Vec<Value> = id_indices.iter().map(|&i| row[i].clone()).collect();
            new_row.push(Value::Text(value_var.to_string()));
            new_row.push(row[v_idx].clone());
            out.push_row(new_row)?;
        }
    }
    Ok(out)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn melts_wide_columns_to_long_and_promotes_keys() {
        let mut table = Table::new(vec![
            ColumnName::new("site"),
            ColumnName::new("y2020"),
            ColumnName::new("y2021"),
        ]);
        table
            .push_row(vec![Value::Text("a".into()), Value::Int(1), Value::Int(2)])
            .unwrap();

        let entity: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: x_id\nkeys: [y2020]\nunnest:\n  id_vars: [site]\n  value_vars: [y2020, y2021]\n  var_name: year\n  value_name: count\n",
        )
        .unwrap();

        let out = unnest(table, &entity).unwrap();
        assert_eq!(
            out.columns(),
            &[
                ColumnName::new("site"),
                ColumnName::new("y2020"),
                ColumnName::new("year"),
                ColumnName::new("count"),
            ]
        );
        assert_eq!(out.len(), 2);
    }
}
