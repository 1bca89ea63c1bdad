use std::sync::Arc;

use chat_logging::chat_info;
use chatvoice_core::{FilterCollection, FilterId, FilterUpdate, NewFilter, TextFilter};

use crate::store::{load, save, SettingsStore, StoreError};

/// CRUD over the stored filter collection. Each call is one
/// read-modify-write of the whole collection.
#[derive(Clone)]
pub struct FilterRepository {
    store: Arc<dyn SettingsStore>,
}

impl FilterRepository {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn collection(&self) -> FilterCollection {
        load(self.store.as_ref())
    }

    pub fn add(&self, draft: NewFilter) -> Result<TextFilter, StoreError> {
        let mut collection = self.collection();
        let filter = collection.add(draft)?;
        save(self.store.as_ref(), &collection)?;
        Ok(filter)
    }

    pub fn update(&self, id: FilterId, update: FilterUpdate) -> Result<(), StoreError> {
        self.modify(|collection| collection.update(id, update))
    }

    pub fn set_enabled(&self, id: FilterId, enabled: bool) -> Result<(), StoreError> {
        self.update(
            id,
            FilterUpdate {
                enabled: Some(enabled),
                ..FilterUpdate::default()
            },
        )
    }

    pub fn remove(&self, id: FilterId) -> Result<TextFilter, StoreError> {
        let mut collection = self.collection();
        let removed = collection.remove(id)?;
        save(self.store.as_ref(), &collection)?;
        Ok(removed)
    }

    pub fn reorder(&self, source_id: FilterId, target_id: FilterId) -> Result<(), StoreError> {
        self.modify(|collection| collection.reorder(source_id, target_id))
    }

    pub fn export_json(&self) -> String {
        self.collection().to_json()
    }

    /// Replaces the stored list; returns how many filters were imported.
    pub fn import_json(&self, json: &str) -> Result<usize, StoreError> {
        let collection = FilterCollection::from_json(json)?;
        let count = collection.filters.len();
        save(self.store.as_ref(), &collection)?;
        chat_info!("Imported {} filters", count);
        Ok(count)
    }

    fn modify<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut FilterCollection) -> Result<(), chatvoice_core::FilterStoreError>,
    {
        let mut collection = self.collection();
        change(&mut collection)?;
        save(self.store.as_ref(), &collection)
    }
}
