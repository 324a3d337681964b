//! Session-scoped synchronization between the local list and a task store.
//!
//! # Responsibility
//! - Drive `Unauthenticated -> Loading -> Ready` from identity transitions.
//! - Expose the render list, the mutation handlers and the failure channel.
//!
//! # Invariants
//! - The rendered list is empty whenever no session is active.
//! - No store failure escapes a handler; each one becomes a `FailureNotice`.

mod failure;
mod state;
mod synchronizer;

pub use failure::{FailureKind, FailureNotice, MutationOutcome, SkipReason, SyncOperation};
pub use state::{ListView, SyncState};
pub use synchronizer::TaskSynchronizer;
