use model::Entity;
use tables::{Table, Value};

/// Step 3 (spec §4.4): assign dense `system_id` 1..N once an entity's row
/// set is finalized (post-transform, pre-children). The same values are
/// also published under the entity's `public_id` column name, since that's
/// the column name children reference once linked -- `public_id`'s values
/// *are* the entity's own `system_id` (spec §4.4 three-tier identity).
pub fn assign(table: &mut Table, entity: &Entity) {
    let ids: Vec<Value> = (1..=table.len() as i64).map(Value::Int).collect();

    if !table.has_column(&entity.system_id) {
        table.add_column(entity.system_id.clone(), ids.clone());
    }
    if entity.public_id != entity.system_id && !table.has_column(&entity.public_id) {
        table.add_column(entity.public_id.clone(), ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnName;

    #[test]
    fn assigns_dense_ids_under_both_column_names() {
        let mut table = Table::new(vec![ColumnName::new("name")]);
        table.push_row(vec![Value::Text("a".into())]).unwrap();
        table.push_row(vec![Value::Text("b".into())]).unwrap();

        let entity: Entity =
            serde_yaml::from_str("kind: fixed\npublic_id: site_id\nvalues: []\n").unwrap();
        assign(&mut table, &entity);

        assert_eq!(
            table.get(0, &ColumnName::new("system_id")).unwrap(),
            &Value::Int(1)
        );
        assert_eq!(
            table.get(1, &ColumnName::new("site_id")).unwrap(),
            &Value::Int(2)
        );
    }
}
