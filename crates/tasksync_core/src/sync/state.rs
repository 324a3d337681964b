//! Local session state guarded by the synchronizer.

use crate::model::item::{Item, ItemId};
use crate::model::session::{Identity, Session, SessionEpoch};
use std::collections::HashMap;

/// Synchronizer lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No session; the rendered list is empty.
    Unauthenticated,
    /// Session present, initial `list` in flight.
    Loading,
    /// List populated, mutation handlers accepted.
    Ready,
}

/// Render snapshot handed to the presentation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub state: SyncState,
    pub identity: Option<Identity>,
    pub items: Vec<Item>,
}

impl ListView {
    pub fn empty() -> Self {
        Self {
            state: SyncState::Unauthenticated,
            identity: None,
            items: Vec::new(),
        }
    }
}

/// Identity and epoch captured when a load starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoadTicket {
    pub(crate) session: Session,
}

#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) state: SyncState,
    pub(crate) session: Option<Session>,
    pub(crate) items: Vec<Item>,
    last_epoch: SessionEpoch,
    // Bumped on every local toggle; a failed update only rolls back when its
    // token is still the latest one for the item.
    revisions: HashMap<ItemId, u64>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            state: SyncState::Unauthenticated,
            session: None,
            items: Vec::new(),
            last_epoch: 0,
            revisions: HashMap::new(),
        }
    }

    /// Starts a session for `identity` unless it is already the active one.
    pub(crate) fn begin(&mut self, identity: Identity) -> Option<LoadTicket> {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.identity == identity)
        {
            return None;
        }

        self.last_epoch += 1;
        let session = Session {
            identity,
            epoch: self.last_epoch,
        };
        self.session = Some(session.clone());
        self.state = SyncState::Loading;
        self.items.clear();
        self.revisions.clear();
        Some(LoadTicket { session })
    }

    /// Drops the session and its list. Returns whether anything changed.
    pub(crate) fn end(&mut self) -> bool {
        let changed = self.session.is_some() || !self.items.is_empty();
        self.session = None;
        self.state = SyncState::Unauthenticated;
        self.items.clear();
        self.revisions.clear();
        changed
    }

    pub(crate) fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.epoch == epoch)
    }

    /// Session accepting mutations, if any.
    pub(crate) fn ready_session(&self) -> Option<Session> {
        match self.state {
            SyncState::Ready => self.session.clone(),
            SyncState::Unauthenticated | SyncState::Loading => None,
        }
    }

    pub(crate) fn replace_items(&mut self, items: Vec<Item>) {
        self.items = items;
        self.revisions.clear();
        self.state = SyncState::Ready;
    }

    pub(crate) fn find_mut(&mut self, id: &ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| &item.id == id)
    }

    pub(crate) fn bump_revision(&mut self, id: &ItemId) -> u64 {
        let revision = self.revisions.entry(id.clone()).or_insert(0);
        *revision += 1;
        *revision
    }

    pub(crate) fn revision(&self, id: &ItemId) -> Option<u64> {
        self.revisions.get(id).copied()
    }

    /// Appends unless a reload already brought the same id in.
    pub(crate) fn append(&mut self, item: Item) -> bool {
        if self.items.iter().any(|existing| existing.id == item.id) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub(crate) fn remove(&mut self, id: &ItemId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.id != id);
        self.revisions.remove(id);
        self.items.len() != before
    }

    pub(crate) fn view(&self) -> ListView {
        ListView {
            state: self.state,
            identity: self.session.as_ref().map(|session| session.identity.clone()),
            items: self.items.clone(),
        }
    }
}
