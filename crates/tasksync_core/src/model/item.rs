//! Tracked item domain model.
//!
//! # Responsibility
//! - Define the dated task/event record mirrored between store and view.
//! - Separate "not yet persisted" drafts from store-identified items.
//!
//! # Invariants
//! - An `Item` always carries the identifier assigned by the store.
//! - `date` and `time` are opaque strings; core never parses them.
//! - New items start with `done == false`.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-assigned identifier, unique within one user's collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Item draft that has not been confirmed by the store yet.
///
/// Carries no identifier: one only exists once `create` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub description: String,
    pub done: bool,
    pub date: String,
    pub time: String,
}

impl NewItem {
    /// Builds a not-done draft from form input.
    pub fn new(
        description: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            done: false,
            date: date.into(),
            time: time.into(),
        }
    }

    /// Attaches the store-assigned identifier.
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            description: self.description,
            done: self.done,
            date: self.date,
            time: self.time,
        }
    }
}

/// Persisted task/event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub description: String,
    /// Completion flag, flipped by status toggles.
    pub done: bool,
    pub date: String,
    pub time: String,
}

impl Item {
    /// Flips completion state in place and returns the new value.
    pub fn toggle(&mut self) -> bool {
        self.done = !self.done;
        self.done
    }
}
