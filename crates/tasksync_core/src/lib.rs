//! Core synchronization logic for TaskSync.
//! This crate is the single source of truth for session and list invariants.

pub mod config;
pub mod db;
pub mod identity;
pub mod logging;
pub mod model;
pub mod store;
pub mod sync;

pub use config::{ConfigError, CoreConfig, SyncConfig, ToggleFailurePolicy};
pub use identity::{IdentityChannel, IdentitySubscription, IdentityWatcher, SubscriptionHandle};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::item::{Item, ItemId, NewItem};
pub use model::session::{AuthState, Identity, Session, SessionEpoch};
pub use store::{InMemoryTaskStore, SqliteTaskStore, StoreError, StoreResult, TaskStore};
pub use sync::{
    FailureKind, FailureNotice, ListView, MutationOutcome, SkipReason, SyncOperation, SyncState,
    TaskSynchronizer,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
