//! Failure notices surfaced to the presentation layer.

use crate::model::item::ItemId;
use crate::store::StoreError;
use std::fmt::{Display, Formatter};

const NOTICE_TITLE: &str = "Ooops";

/// Synchronizer entry point that produced a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Load,
    Add,
    ToggleStatus,
    Remove,
}

impl SyncOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Add => "add",
            Self::ToggleStatus => "toggle_status",
            Self::Remove => "remove",
        }
    }
}

/// Failure taxonomy visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    StoreUnavailable,
    NotFound,
    /// The session's item list could not be fetched.
    LoadFailure,
}

/// One user-facing failure alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    pub operation: SyncOperation,
    pub kind: FailureKind,
    pub item_id: Option<ItemId>,
    pub cause: StoreError,
}

impl FailureNotice {
    pub(crate) fn new(
        operation: SyncOperation,
        item_id: Option<ItemId>,
        cause: StoreError,
    ) -> Self {
        let kind = match (operation, &cause) {
            (SyncOperation::Load, _) => FailureKind::LoadFailure,
            (_, StoreError::NotFound(_)) => FailureKind::NotFound,
            (_, StoreError::StoreUnavailable(_)) => FailureKind::StoreUnavailable,
        };
        Self {
            operation,
            kind,
            item_id,
            cause,
        }
    }

    pub fn title(&self) -> &'static str {
        NOTICE_TITLE
    }

    pub fn message(&self) -> &'static str {
        match self.operation {
            SyncOperation::Load => "Failed to load Events. Please try again.",
            SyncOperation::Add => "Failed to add Event. Please try again.",
            SyncOperation::ToggleStatus => "Failed to update Event status. Please try again.",
            SyncOperation::Remove => "Failed to remove Event. Please try again.",
        }
    }
}

impl Display for FailureNotice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.title(), self.message(), self.cause)
    }
}

/// What a handler did to the local list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Local list reflects the confirmed (or optimistic) change.
    Applied,
    /// Nothing attempted.
    Skipped(SkipReason),
    /// The session changed while the remote call was in flight.
    Discarded,
    /// Remote call failed; a notice was published.
    Failed(FailureKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotReady,
    UnknownItem,
}
