use model::{ColumnName, Entity};
use tables::{Table, TableError};

use crate::error::TransformError;

/// Step 1: column projection (spec §4.3.1). Keeps `entity.columns` (or, when
/// empty, every source column), plus any column required downstream -- the
/// business `keys` and every FK's `local_keys` -- even when the author
/// didn't list it explicitly, since dedup and linking need it later.
pub fn project(source: &Table, entity: &Entity) -> Result<Table, TransformError> {
    let mut wanted: Vec<ColumnName> = if entity.columns.is_empty() {
        source.columns().to_vec()
    } else {
        entity.columns.clone()
    };

    for key in entity
        .keys
        .iter()
        .chain(entity.foreign_keys.iter().flat_map(|fk| fk.local_keys.iter()))
    {
        if !wanted.contains(key) {
            wanted.push(key.clone());
        }
    }

    source.project(&wanted).map_err(|e| match e {
        TableError::ColumnNotFound(name) => TransformError::ColumnNotFound(ColumnName::new(name)),
        other => TransformError::Table(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tables::Value;

    fn entity(yaml: &str) -> Entity {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn keeps_declared_columns_plus_keys() {
        let mut source = Table::new(vec![
            ColumnName::new("a"),
            ColumnName::new("b"),
            ColumnName::new("c"),
        ]);
        source
            .push_row(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();

        let e = entity("kind: fixed\npublic_id: x_id\ncolumns: [b]\nkeys: [a]\n");
        let out = project(&source, &e).unwrap();
        assert_eq!(out.columns(), &[ColumnName::new("b"), ColumnName::new("a")]);
    }

    #[test]
    fn missing_declared_column_is_an_error() {
        let source = Table::new(vec![ColumnName::new("a")]);
        let e = entity("kind: fixed\npublic_id: x_id\ncolumns: [missing]\n");
        assert!(matches!(
            project(&source, &e),
            Err(TransformError::ColumnNotFound(_))
        ));
    }
}
