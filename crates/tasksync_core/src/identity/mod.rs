//! Identity watcher contracts.
//!
//! # Responsibility
//! - Turn authentication transitions into a cancellable event stream.
//! - Keep the auth provider protocol outside of core.
//!
//! # Invariants
//! - A fresh subscription yields the current state first.
//! - Afterwards one value is yielded per observed transition.
//! - Cancelling a subscription is idempotent and never fails.

mod channel;

pub use channel::{IdentityChannel, IdentitySubscription, SubscriptionHandle};

/// Source of authentication state transitions.
pub trait IdentityWatcher {
    /// Opens a new subscription starting at the current state.
    fn subscribe(&self) -> IdentitySubscription;
}
