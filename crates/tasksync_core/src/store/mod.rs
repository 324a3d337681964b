//! Remote task store contracts and implementations.
//!
//! # Responsibility
//! - Define the per-user collection API the synchronizer talks to.
//! - Map backend failures to the store error taxonomy.
//!
//! # Invariants
//! - Every operation is scoped by a caller-supplied `Identity`.
//! - `list` on an empty collection returns an empty vector, not an error.
//! - `delete` of a missing id succeeds.
//! - `update` of a missing id fails with `StoreError::NotFound`.

mod memory;
mod sqlite;

pub use memory::InMemoryTaskStore;
pub use sqlite::SqliteTaskStore;

use crate::db::DbError;
use crate::model::item::{Item, ItemId, NewItem};
use crate::model::session::Identity;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type StoreResult<T> = Result<T, StoreError>;

/// Remote store failure taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transient or permanent remote failure (network, auth, backend).
    StoreUnavailable(String),
    /// Referenced item no longer exists remotely.
    NotFound(ItemId),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable(message.into())
    }

    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::NotFound(_) => "not_found",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StoreUnavailable(message) => write!(f, "task store unavailable: {message}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
        }
    }
}

impl Error for StoreError {}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::StoreUnavailable(value.to_string())
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StoreUnavailable(value.to_string())
    }
}

/// Per-user remote collection of items.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Reads the whole collection in store order.
    async fn list(&self, identity: &Identity) -> StoreResult<Vec<Item>>;

    /// Persists a draft and returns its freshly assigned identifier.
    async fn create(&self, identity: &Identity, item: &NewItem) -> StoreResult<ItemId>;

    /// Replaces the stored item keyed by `item.id`.
    async fn update(&self, identity: &Identity, item: &Item) -> StoreResult<()>;

    /// Deletes one item; missing ids are treated as already deleted.
    async fn delete(&self, identity: &Identity, id: &ItemId) -> StoreResult<()>;
}

#[async_trait]
impl<S: TaskStore + ?Sized> TaskStore for Arc<S> {
    async fn list(&self, identity: &Identity) -> StoreResult<Vec<Item>> {
        (**self).list(identity).await
    }

    async fn create(&self, identity: &Identity, item: &NewItem) -> StoreResult<ItemId> {
        (**self).create(identity, item).await
    }

    async fn update(&self, identity: &Identity, item: &Item) -> StoreResult<()> {
        (**self).update(identity, item).await
    }

    async fn delete(&self, identity: &Identity, id: &ItemId) -> StoreResult<()> {
        (**self).delete(identity, id).await
    }
}
