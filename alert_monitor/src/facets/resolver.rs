//! Read-mostly facet lookups.
//!
//! Readers load an `Arc<FacetTable>` snapshot without locking; [`FacetResolver::reload`]
//! re-reads the stored table and swaps it in. The scheduler reloads once per
//! alert poll, so every lookup of that poll sees the same table.
//!
//! Lookups are soft: an unknown field or code is logged and handed back
//! unchanged, never turned into an error.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::{
    models::FacetTable,
    store::{JsonStore, JsonStoreExt, StoreResult},
};

pub struct FacetResolver {
    store: Arc<dyn JsonStore>,
    key: String,
    table: ArcSwap<FacetTable>,
}

impl FacetResolver {
    /// Starts with an empty table; call [`Self::reload`] to read the stored one.
    pub fn new(store: Arc<dyn JsonStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            table: ArcSwap::from_pointee(FacetTable::new()),
        }
    }

    /// Re-reads the stored table. A missing table becomes an empty one; a
    /// corrupt one is reported and the current snapshot kept.
    pub fn reload(&self) -> StoreResult<()> {
        match self.store.load_as::<FacetTable>(&self.key)? {
            Some(table) => {
                debug!(key = %self.key, fields = table.fields().count(), "facet table loaded");
                self.table.store(Arc::new(table));
            }
            None => {
                warn!(key = %self.key, "facet table not found, labels will pass through");
                self.table.store(Arc::new(FacetTable::new()));
            }
        }
        Ok(())
    }

    /// Swaps in `table` without touching the store.
    pub fn replace(&self, table: FacetTable) {
        self.table.store(Arc::new(table));
    }

    pub fn snapshot(&self) -> Arc<FacetTable> {
        self.table.load_full()
    }

    /// Label of `code` in `field`, or `code` itself when unknown.
    pub fn label_for(&self, code: &str, field: &str) -> String {
        match self.table.load().label_for(field, code) {
            Some(label) => label.to_string(),
            None => {
                warn!(field, code, "no label for code");
                code.to_string()
            }
        }
    }

    /// Code of `label` in `field`, or `label` itself when unknown.
    pub fn code_for(&self, label: &str, field: &str) -> String {
        match self.table.load().code_for(field, label) {
            Some(code) => code.to_string(),
            None => {
                warn!(field, label, "no code for label");
                label.to_string()
            }
        }
    }

    /// Every label of `field` in table order; empty for an unknown field.
    pub fn all_labels(&self, field: &str) -> Vec<String> {
        match self.table.load().entries(field) {
            Some(entries) => entries.iter().map(|e| e.value.clone()).collect(),
            None => {
                warn!(field, "unknown facet field");
                Vec::new()
            }
        }
    }
}
