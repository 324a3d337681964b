//! In-process identity watcher.
//!
//! The external auth collaborator publishes into `IdentityChannel`. Each
//! subscription owns an ordered queue, so every transition reaches every
//! subscriber even when several happen between two polls.

use crate::identity::IdentityWatcher;
use crate::model::session::{AuthState, Identity};
use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Publisher side of the identity stream.
#[derive(Debug)]
pub struct IdentityChannel {
    inner: Mutex<ChannelState>,
}

#[derive(Debug)]
struct ChannelState {
    current: AuthState,
    subscribers: Vec<mpsc::UnboundedSender<AuthState>>,
}

impl IdentityChannel {
    pub fn new(initial: AuthState) -> Self {
        Self {
            inner: Mutex::new(ChannelState {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self::new(AuthState::SignedOut)
    }

    /// Publishes a new auth state.
    ///
    /// Returns `false` when `state` equals the current value; no transition
    /// is emitted in that case.
    pub fn publish(&self, state: AuthState) -> bool {
        let mut inner = self.inner.lock();
        let changed = inner.current != state;
        if changed {
            inner.current = state.clone();
            inner
                .subscribers
                .retain(|subscriber| subscriber.send(state.clone()).is_ok());
        }
        debug!(
            "event=identity_publish module=identity status=ok changed={} subscribers={}",
            changed,
            inner.subscribers.len()
        );
        changed
    }

    pub fn sign_in(&self, identity: Identity) -> bool {
        self.publish(AuthState::SignedIn(identity))
    }

    pub fn sign_out(&self) -> bool {
        self.publish(AuthState::SignedOut)
    }

    pub fn current(&self) -> AuthState {
        self.inner.lock().current.clone()
    }
}

impl Default for IdentityChannel {
    fn default() -> Self {
        Self::signed_out()
    }
}

impl IdentityWatcher for IdentityChannel {
    fn subscribe(&self) -> IdentitySubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        // Queued under the lock so no publish can slip ahead of it.
        let _ = sender.send(inner.current.clone());
        inner.subscribers.push(sender);
        IdentitySubscription {
            receiver,
            handle: SubscriptionHandle::default(),
        }
    }
}

/// Cancellation handle shared by a subscription and its clones.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug, Default)]
struct HandleInner {
    cancelled: AtomicBool,
    wake: Notify,
}

impl SubscriptionHandle {
    /// Stops further delivery. Safe to call any number of times.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            debug!("event=identity_unsubscribe module=identity status=ok");
        }
        self.inner.wake.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

/// Subscriber side of the identity stream.
#[derive(Debug)]
pub struct IdentitySubscription {
    receiver: mpsc::UnboundedReceiver<AuthState>,
    handle: SubscriptionHandle,
}

impl IdentitySubscription {
    /// Returns a handle that cancels this subscription.
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Waits for the next auth state.
    ///
    /// Yields the state current at subscription time first, then one value
    /// per transition in publish order. Returns `None` once the subscription
    /// is cancelled, or once the publisher is gone and the queue is drained.
    pub async fn next(&mut self) -> Option<AuthState> {
        let handle = self.handle.clone();
        let cancelled = handle.inner.wake.notified();
        tokio::pin!(cancelled);
        // Register interest before checking the flag so a concurrent cancel
        // cannot slip between check and wait.
        cancelled.as_mut().enable();
        if handle.is_cancelled() {
            self.receiver.close();
            return None;
        }

        tokio::select! {
            state = self.receiver.recv() => {
                if handle.is_cancelled() {
                    self.receiver.close();
                    return None;
                }
                state
            }
            () = &mut cancelled => {
                self.receiver.close();
                None
            }
        }
    }
}
