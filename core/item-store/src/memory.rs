//! FILENAME: core/item-store/src/memory.rs
//! PURPOSE: In-memory reference implementation of `ItemStore`.
//! CONTEXT: Used by tests and benches, and as the template for real stores.
//! Items live in a `BTreeMap` so snapshots come out sorted for free.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::predicate::Predicate;
use crate::store::{BaseView, ConcreteView, ItemReader, ItemStore, StoreError};
use crate::value::{AttrValue, AttributeId, ItemId};

type ItemRecord = FxHashMap<AttributeId, AttrValue>;

#[derive(Debug, Default)]
struct StoreData {
    items: BTreeMap<ItemId, ItemRecord>,
    views: FxHashMap<String, Predicate>,
    /// Attributes removed from the schema; reading them is an error.
    retired: FxHashSet<AttributeId>,
}

/// A `RwLock`-guarded item map. Readers never block each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
    view_epoch: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Poisoning only means a writer panicked mid-update; the map itself is
    // still structurally valid.
    fn read(&self) -> RwLockReadGuard<'_, StoreData> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreData> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts or replaces an item.
    pub fn insert_item(
        &self,
        item: ItemId,
        attributes: impl IntoIterator<Item = (AttributeId, AttrValue)>,
    ) {
        let record: ItemRecord = attributes.into_iter().collect();
        self.write().items.insert(item, record);
    }

    /// Sets one attribute. Returns false if the item does not exist.
    pub fn set_attribute(&self, item: ItemId, attribute: AttributeId, value: AttrValue) -> bool {
        match self.write().items.get_mut(&item) {
            Some(record) => {
                record.insert(attribute, value);
                true
            }
            None => false,
        }
    }

    pub fn remove_item(&self, item: ItemId) -> bool {
        self.write().items.remove(&item).is_some()
    }

    /// Drops an attribute from every item; later reads of it fail.
    pub fn retire_attribute(&self, attribute: AttributeId) {
        let mut data = self.write();
        for record in data.items.values_mut() {
            record.remove(&attribute);
        }
        data.retired.insert(attribute);
    }

    pub fn define_view(&self, name: impl Into<String>, predicate: Predicate) {
        self.write().views.insert(name.into(), predicate);
        self.view_epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn remove_view(&self, name: &str) -> bool {
        let removed = self.write().views.remove(name).is_some();
        if removed {
            self.view_epoch.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ItemStore for MemoryStore {
    fn resolve_base_view(&self, view: &BaseView) -> Option<ConcreteView> {
        match view {
            BaseView::All => Some(ConcreteView::new(Predicate::True)),
            BaseView::Matching(predicate) => Some(ConcreteView::new(predicate.clone())),
            BaseView::Named(name) => self
                .read()
                .views
                .get(name)
                .map(|predicate| ConcreteView::new(predicate.clone())),
        }
    }

    fn read_unit<R>(&self, unit: impl FnOnce(&dyn ItemReader) -> R) -> R {
        let guard = self.read();
        let reader = MemoryReader { data: &guard };
        unit(&reader)
    }

    fn view_epoch(&self) -> u64 {
        self.view_epoch.load(Ordering::SeqCst)
    }
}

struct MemoryReader<'a> {
    data: &'a StoreData,
}

impl ItemReader for MemoryReader<'_> {
    fn snapshot_sorted_ids(&self, view: &ConcreteView) -> Vec<ItemId> {
        let mut ids = Vec::new();
        for &item in self.data.items.keys() {
            match view.predicate().evaluate(item, self) {
                Ok(true) => ids.push(item),
                Ok(false) => {}
                Err(e) => log::warn!(
                    target: "item_store",
                    "excluding item {} from snapshot: {}",
                    item,
                    e
                ),
            }
        }
        ids
    }

    fn read_attribute(
        &self,
        item: ItemId,
        attribute: AttributeId,
    ) -> Result<AttrValue, StoreError> {
        if self.data.retired.contains(&attribute) {
            return Err(StoreError::UnknownAttribute(attribute));
        }
        let record = self
            .data
            .items
            .get(&item)
            .ok_or(StoreError::ItemNotFound(item))?;
        Ok(record.get(&attribute).cloned().unwrap_or_default())
    }
}
