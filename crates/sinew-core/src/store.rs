//! Work item storage seam.
//!
//! The engine owns items exclusively through this trait so tests (and the
//! excluded persistence layer) can substitute their own backing. The
//! in-memory implementation is the canonical one; everything here is
//! synchronous and allocation-cheap.

use std::collections::BTreeMap;

use crate::model::item::WorkItem;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("work item not found: '{0}'")]
    NotFound(String),
    #[error("work item id already exists: '{0}'")]
    DuplicateId(String),
}

/// Canonical holder of work item records.
///
/// Implementations must keep `all()` iteration deterministic so snapshots
/// and reports are stable.
pub trait ItemStore: Default {
    fn get(&self, id: &str) -> Option<&WorkItem>;

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert a new item.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateId`] if the id is already present.
    fn insert(&mut self, item: WorkItem) -> Result<(), StoreError>;

    /// Replace an existing item.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the id is not present.
    fn update(&mut self, item: WorkItem) -> Result<(), StoreError>;

    /// Remove and return an item.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the id is not present.
    fn remove(&mut self, id: &str) -> Result<WorkItem, StoreError>;

    /// All items in deterministic (id) order.
    fn all(&self) -> Vec<&WorkItem>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map-backed store; the default backing for a project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InMemoryStore {
    items: BTreeMap<String, WorkItem>,
}

impl ItemStore for InMemoryStore {
    fn get(&self, id: &str) -> Option<&WorkItem> {
        self.items.get(id)
    }

    fn insert(&mut self, item: WorkItem) -> Result<(), StoreError> {
        if self.items.contains_key(&item.id) {
            return Err(StoreError::DuplicateId(item.id));
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn update(&mut self, item: WorkItem) -> Result<(), StoreError> {
        if !self.items.contains_key(&item.id) {
            return Err(StoreError::NotFound(item.id));
        }
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<WorkItem, StoreError> {
        self.items
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn all(&self) -> Vec<&WorkItem> {
        self.items.values().collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
