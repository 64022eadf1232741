use model::{Entity, EntityName};
use tables::{Table, TableStore};

use crate::error::SourceError;

/// C2, `kind: derived`: a shallow copy of `TableStore[source]` (spec §4.2).
/// The source entity must already have finished processing -- the Normalizer
/// guarantees this by ordering entities per the dependency graph's
/// topological order before invoking any loader (spec §4.1 Invariant 7).
pub fn load(name: &EntityName, entity: &Entity, store: &TableStore) -> Result<Table, SourceError> {
    let source = entity
        .source
        .as_ref()
        .ok_or_else(|| SourceError::MissingSource(name.clone()))?;

    store
        .try_get(source)
        .cloned()
        .ok_or_else(|| SourceError::SourceNotReady(name.clone(), source.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnName;

    #[test]
    fn copies_source_table() {
        let store = TableStore::new(vec![EntityName::new("parent")]);
        store
            .complete(&EntityName::new("parent"), Table::new(vec![ColumnName::new("x")]))
            .unwrap();

        let entity: Entity =
            serde_yaml::from_str("kind: derived\npublic_id: x_id\nsource: parent\n").unwrap();
        let table = load(&EntityName::new("child"), &entity, &store).unwrap();
        assert_eq!(table.columns(), &[ColumnName::new("x")]);
    }

    #[test]
    fn source_not_ready_is_an_error() {
        let store = TableStore::new(vec![EntityName::new("parent")]);
        let entity: Entity =
            serde_yaml::from_str("kind: derived\npublic_id: x_id\nsource: parent\n").unwrap();
        assert!(matches!(
            load(&EntityName::new("child"), &entity, &store),
            Err(SourceError::SourceNotReady(_, _))
        ));
    }
}
