//! Process-local task store.
//!
//! Keeps one ordered collection per identity. An availability switch lets
//! callers simulate a remote outage.

use crate::model::item::{Item, ItemId, NewItem};
use crate::model::session::Identity;
use crate::store::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;

#[derive(Debug)]
enum IdScheme {
    Uuid,
    Sequential { prefix: String, next: AtomicU64 },
}

/// In-memory `TaskStore` implementation.
#[derive(Debug)]
pub struct InMemoryTaskStore {
    collections: Mutex<HashMap<Identity, Vec<Item>>>,
    available: AtomicBool,
    ids: IdScheme,
}

impl InMemoryTaskStore {
    /// Creates an empty store assigning UUID v4 identifiers.
    pub fn new() -> Self {
        Self::with_scheme(IdScheme::Uuid)
    }

    /// Creates an empty store assigning `{prefix}{n}` identifiers.
    ///
    /// `n` counts up from 1 and skips values already taken in the target
    /// collection.
    pub fn with_sequential_ids(prefix: impl Into<String>) -> Self {
        Self::with_scheme(IdScheme::Sequential {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        })
    }

    fn with_scheme(ids: IdScheme) -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            ids,
        }
    }

    /// Replaces one user's collection wholesale.
    pub fn seed(&self, identity: &Identity, items: Vec<Item>) {
        self.collections.lock().insert(identity.clone(), items);
    }

    /// Returns a copy of one user's collection, bypassing availability.
    pub fn snapshot(&self, identity: &Identity) -> Vec<Item> {
        self.collections
            .lock()
            .get(identity)
            .cloned()
            .unwrap_or_default()
    }

    /// Toggles simulated remote availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable("in-memory store switched offline"))
        }
    }

    fn next_id(&self, existing: &[Item]) -> ItemId {
        match &self.ids {
            IdScheme::Uuid => ItemId::new(Uuid::new_v4().to_string()),
            IdScheme::Sequential { prefix, next } => loop {
                let candidate = format!("{prefix}{}", next.fetch_add(1, Ordering::SeqCst));
                if existing.iter().all(|item| item.id.as_str() != candidate) {
                    return ItemId::new(candidate);
                }
            },
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list(&self, identity: &Identity) -> StoreResult<Vec<Item>> {
        self.ensure_available()?;
        Ok(self.snapshot(identity))
    }

    async fn create(&self, identity: &Identity, item: &NewItem) -> StoreResult<ItemId> {
        self.ensure_available()?;
        let mut collections = self.collections.lock();
        let collection = collections.entry(identity.clone()).or_default();
        let id = self.next_id(collection.as_slice());
        collection.push(item.clone().into_item(id.clone()));
        Ok(id)
    }

    async fn update(&self, identity: &Identity, item: &Item) -> StoreResult<()> {
        self.ensure_available()?;
        let mut collections = self.collections.lock();
        let stored = collections
            .get_mut(identity)
            .and_then(|collection| collection.iter_mut().find(|stored| stored.id == item.id))
            .ok_or_else(|| StoreError::NotFound(item.id.clone()))?;
        *stored = item.clone();
        Ok(())
    }

    async fn delete(&self, identity: &Identity, id: &ItemId) -> StoreResult<()> {
        self.ensure_available()?;
        if let Some(collection) = self.collections.lock().get_mut(identity) {
            collection.retain(|item| &item.id != id);
        }
        Ok(())
    }
}
