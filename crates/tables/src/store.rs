use crate::Table;
use indexmap::IndexMap;
use model::EntityName;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("entity {0:?} is not a member of this table store")]
    UnknownEntity(EntityName),
    #[error("entity {0:?} has not finished processing")]
    NotReady(EntityName),
    #[error("entity {0:?} was already completed")]
    AlreadyComplete(EntityName),
}

/// Process-local map of entity name to its materialized output for the
/// current run (spec §3.1 TableStore). Slots are reserved up front in
/// topological order; each is write-once, guarded by a completion latch so
/// that concurrent readers (other workers, preview, validation) observe
/// either "absent" or a fully-formed table, never a partial one (spec §5).
#[derive(Debug)]
pub struct TableStore {
    slots: IndexMap<EntityName, Arc<OnceCell<Table>>>,
}

impl TableStore {
    /// Reserve one write-once slot per entity, in `order` (normally the
    /// graph's topological order). Insertion order is preserved by
    /// `IndexMap` and recoverable via [`TableStore::order`].
    pub fn new(order: impl IntoIterator<Item = EntityName>) -> Self {
        let slots = order
            .into_iter()
            .map(|name| (name, Arc::new(OnceCell::new())))
            .collect();
        TableStore { slots }
    }

    pub fn order(&self) -> impl Iterator<Item = &EntityName> {
        self.slots.keys()
    }

    /// Non-blocking: returns `None` ("NOT_READY") if `entity` hasn't
    /// finished, or is unknown.
    pub fn try_get(&self, entity: &EntityName) -> Option<&Table> {
        self.slots.get(entity).and_then(|cell| cell.get())
    }

    pub fn get(&self, entity: &EntityName) -> Result<&Table, StoreError> {
        self.try_get(entity)
            .ok_or_else(|| StoreError::NotReady(entity.clone()))
    }

    pub fn contains(&self, entity: &EntityName) -> bool {
        self.slots.contains_key(entity)
    }

    /// Publish `table` as the completed output of `entity`. May be called
    /// at most once per entity: a second call is an
    /// [`StoreError::AlreadyComplete`], guarding the "no partial writes"
    /// invariant under concurrent workers (spec §5).
    pub fn complete(&self, entity: &EntityName, table: Table) -> Result<(), StoreError> {
        let cell = self
            .slots
            .get(entity)
            .ok_or_else(|| StoreError::UnknownEntity(entity.clone()))?;
        cell.set(table)
            .map_err(|_| StoreError::AlreadyComplete(entity.clone()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnName;

    #[test]
    fn preserves_insertion_order() {
        let order = vec![
            EntityName::new("a"),
            EntityName::new("b"),
            EntityName::new("c"),
        ];
        let store = TableStore::new(order.clone());
        let got: Vec<_> = store.order().cloned().collect();
        assert_eq!(got, order);
    }

    #[test]
    fn not_ready_until_completed() {
        let store = TableStore::new(vec![EntityName::new("a")]);
        assert!(matches!(
            store.get(&EntityName::new("a")),
            Err(StoreError::NotReady(_))
        ));
        store
            .complete(&EntityName::new("a"), Table::new(vec![ColumnName::new("x")]))
            .unwrap();
        assert!(store.get(&EntityName::new("a")).is_ok());
    }

    #[test]
    fn cannot_complete_twice() {
        let store = TableStore::new(vec![EntityName::new("a")]);
        store
            .complete(&EntityName::new("a"), Table::default())
            .unwrap();
        assert!(matches!(
            store.complete(&EntityName::new("a"), Table::default()),
            Err(StoreError::AlreadyComplete(_))
        ));
    }
}
