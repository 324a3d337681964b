//! Task synchronizer state machine.
//!
//! # Responsibility
//! - Own the session and the in-memory item list.
//! - Apply handler mutations locally and against the task store.
//! - Convert every store failure into a `FailureNotice`.
//!
//! # Invariants
//! - The state lock is never held across an `.await`.
//! - Completions whose session epoch is no longer current are dropped.
//! - Add and Remove touch the list only after the store confirms.
//! - ToggleStatus flips the local flag before the store is called.

use crate::config::{SyncConfig, ToggleFailurePolicy};
use crate::identity::IdentitySubscription;
use crate::model::item::{Item, ItemId, NewItem};
use crate::model::session::{AuthState, Identity, Session};
use crate::store::{StoreError, TaskStore};
use crate::sync::failure::{FailureNotice, MutationOutcome, SkipReason, SyncOperation};
use crate::sync::state::{ListView, LoadTicket, SessionState, SyncState};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Keeps the local item list of the signed-in user in step with a `TaskStore`.
pub struct TaskSynchronizer<S: TaskStore> {
    store: S,
    config: SyncConfig,
    inner: Mutex<SessionState>,
    view: watch::Sender<ListView>,
    failures: broadcast::Sender<FailureNotice>,
}

impl<S: TaskStore> TaskSynchronizer<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: S, config: SyncConfig) -> Self {
        let (view, _) = watch::channel(ListView::empty());
        let (failures, _) = broadcast::channel(config.failure_channel_capacity.max(1));
        Self {
            store,
            config,
            inner: Mutex::new(SessionState::new()),
            view,
            failures,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn state(&self) -> SyncState {
        self.inner.lock().state
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.identity.clone())
    }

    /// Current list for rendering; empty whenever signed out.
    pub fn items(&self) -> Vec<Item> {
        self.inner.lock().items.clone()
    }

    pub fn view(&self) -> ListView {
        self.inner.lock().view()
    }

    /// Receives a fresh `ListView` after every committed change.
    pub fn subscribe_view(&self) -> watch::Receiver<ListView> {
        self.view.subscribe()
    }

    /// Receives every failure notice published after subscribing.
    pub fn subscribe_failures(&self) -> broadcast::Receiver<FailureNotice> {
        self.failures.subscribe()
    }

    /// Applies one identity transition and, on sign-in, waits for the load.
    pub async fn on_auth_state(&self, auth: AuthState) {
        match auth {
            AuthState::SignedOut => self.sign_out(),
            AuthState::SignedIn(identity) => {
                if let Some(ticket) = self.begin_session(identity) {
                    self.load(ticket).await;
                }
            }
        }
    }

    /// Re-reads the whole list for the current session.
    ///
    /// Valid only in `Ready`; the list stays visible while the call runs.
    pub async fn reload(&self) -> MutationOutcome {
        let Some(session) = self.inner.lock().ready_session() else {
            return MutationOutcome::Skipped(SkipReason::NotReady);
        };
        self.load(LoadTicket { session }).await
    }

    /// Creates an item remotely, then appends it with the store's id.
    pub async fn add(
        &self,
        description: impl Into<String>,
        date: impl Into<String>,
        time: impl Into<String>,
    ) -> MutationOutcome {
        let Some(session) = self.inner.lock().ready_session() else {
            return MutationOutcome::Skipped(SkipReason::NotReady);
        };

        let draft = NewItem::new(description, date, time);
        let created = self.store.create(&session.identity, &draft).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(session.epoch) {
            log_discarded(SyncOperation::Add, &session);
            return MutationOutcome::Discarded;
        }
        match created {
            Ok(id) => {
                debug!(
                    "event=item_add module=sync status=ok epoch={} item_id={}",
                    session.epoch, id
                );
                if inner.append(draft.into_item(id)) {
                    self.publish(&inner);
                }
                MutationOutcome::Applied
            }
            Err(err) => {
                drop(inner);
                self.fail(SyncOperation::Add, None, err)
            }
        }
    }

    /// Flips `done` locally right away, then pushes the full item.
    pub async fn toggle_status(&self, id: &ItemId) -> MutationOutcome {
        let (session, snapshot, revision) = {
            let mut inner = self.inner.lock();
            let Some(session) = inner.ready_session() else {
                return MutationOutcome::Skipped(SkipReason::NotReady);
            };
            let Some(item) = inner.find_mut(id) else {
                return MutationOutcome::Skipped(SkipReason::UnknownItem);
            };
            item.toggle();
            let snapshot = item.clone();
            let revision = inner.bump_revision(id);
            self.publish(&inner);
            (session, snapshot, revision)
        };

        let updated = self.store.update(&session.identity, &snapshot).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(session.epoch) {
            log_discarded(SyncOperation::ToggleStatus, &session);
            return MutationOutcome::Discarded;
        }
        let Err(err) = updated else {
            return MutationOutcome::Applied;
        };

        if self.config.toggle_failure_policy == ToggleFailurePolicy::Rollback
            && inner.revision(id) == Some(revision)
        {
            if let Some(item) = inner.find_mut(id) {
                item.done = !snapshot.done;
                self.publish(&inner);
                debug!(
                    "event=item_toggle module=sync status=rolled_back epoch={} item_id={}",
                    session.epoch, id
                );
            }
        }
        drop(inner);
        self.fail(SyncOperation::ToggleStatus, Some(id.clone()), err)
    }

    /// Deletes remotely, then drops the item from the local list.
    pub async fn remove(&self, id: &ItemId) -> MutationOutcome {
        let Some(session) = self.inner.lock().ready_session() else {
            return MutationOutcome::Skipped(SkipReason::NotReady);
        };

        let deleted = self.store.delete(&session.identity, id).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(session.epoch) {
            log_discarded(SyncOperation::Remove, &session);
            return MutationOutcome::Discarded;
        }
        match deleted {
            Ok(()) => {
                if inner.remove(id) {
                    self.publish(&inner);
                }
                MutationOutcome::Applied
            }
            Err(err) => {
                drop(inner);
                self.fail(SyncOperation::Remove, Some(id.clone()), err)
            }
        }
    }

    fn sign_out(&self) {
        let mut inner = self.inner.lock();
        if inner.end() {
            info!("event=session_end module=sync status=ok");
        }
        self.publish(&inner);
    }

    fn begin_session(&self, identity: Identity) -> Option<LoadTicket> {
        let mut inner = self.inner.lock();
        let ticket = inner.begin(identity)?;
        info!(
            "event=session_begin module=sync status=ok epoch={}",
            ticket.session.epoch
        );
        self.publish(&inner);
        Some(ticket)
    }

    async fn load(&self, ticket: LoadTicket) -> MutationOutcome {
        let session = ticket.session;
        let listed = self.store.list(&session.identity).await;

        let mut inner = self.inner.lock();
        if !inner.is_current(session.epoch) {
            log_discarded(SyncOperation::Load, &session);
            return MutationOutcome::Discarded;
        }
        match listed {
            Ok(items) => {
                info!(
                    "event=session_load module=sync status=ok epoch={} count={}",
                    session.epoch,
                    items.len()
                );
                inner.replace_items(items);
                self.publish(&inner);
                MutationOutcome::Applied
            }
            Err(err) => {
                // Handlers stay usable on an empty list; no automatic retry.
                if inner.state == SyncState::Loading {
                    inner.replace_items(Vec::new());
                    self.publish(&inner);
                }
                drop(inner);
                self.fail(SyncOperation::Load, None, err)
            }
        }
    }

    fn publish(&self, inner: &SessionState) {
        self.view.send_replace(inner.view());
    }

    fn fail(
        &self,
        operation: SyncOperation,
        item_id: Option<ItemId>,
        cause: StoreError,
    ) -> MutationOutcome {
        warn!(
            "event=sync_failure module=sync status=error operation={} error_code={} item_id={}",
            operation.as_str(),
            cause.code(),
            item_id.as_ref().map_or("-", ItemId::as_str)
        );
        let notice = FailureNotice::new(operation, item_id, cause);
        let kind = notice.kind;
        if self.failures.send(notice).is_err() {
            debug!(
                "event=sync_failure module=sync status=unobserved operation={}",
                operation.as_str()
            );
        }
        MutationOutcome::Failed(kind)
    }
}

impl<S: TaskStore + 'static> TaskSynchronizer<S> {
    /// Drives the state machine from an identity stream until it ends.
    ///
    /// Each sign-in load runs as its own task so a sign-out arriving
    /// mid-load takes effect immediately.
    pub async fn follow_identity(self: Arc<Self>, mut subscription: IdentitySubscription) {
        while let Some(auth) = subscription.next().await {
            match auth {
                AuthState::SignedOut => self.sign_out(),
                AuthState::SignedIn(identity) => {
                    if let Some(ticket) = self.begin_session(identity) {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            this.load(ticket).await;
                        });
                    }
                }
            }
        }
        debug!("event=identity_stream_end module=sync status=ok");
    }
}

fn log_discarded(operation: SyncOperation, session: &Session) {
    debug!(
        "event=stale_completion module=sync status=discarded operation={} epoch={}",
        operation.as_str(),
        session.epoch
    );
}
