use model::{Entity, EntityName};
use tables::{Table, Value};

use crate::error::SourceError;

/// C2, `kind: fixed`: inline rows from `values`, with `columns` as the
/// header (spec §4.2).
pub fn load(name: &EntityName, entity: &Entity) -> Result<Table, SourceError> {
    let mut table = Table::new(entity.columns.clone());
    for row in &entity.values {
        if row.len() != entity.columns.len() {
            return Err(SourceError::FixedRowShape(
                name.clone(),
                row.len(),
                entity.columns.len(),
            ));
        }
        let values: Vec<Value> = row.iter().map(Value::from_json).collect();
        table.push_row(values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_inline_rows() {
        let entity: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: location_id\ncolumns: [name, code]\nvalues:\n  - [\"Norway\", \"NO\"]\n",
        )
        .unwrap();
        let table = load(&EntityName::new("location"), &entity).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][0], Value::Text("Norway".to_string()));
    }

    #[test]
    fn row_shape_mismatch_is_an_error() {
        let entity: Entity = serde_yaml::from_str(
            "kind: fixed\npublic_id: x_id\ncolumns: [a, b]\nvalues:\n  - [1]\n",
        )
        .unwrap();
        assert!(matches!(
            load(&EntityName::new("t"), &entity),
            Err(SourceError::FixedRowShape(_, 1, 2))
        ));
    }
}
