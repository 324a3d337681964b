//! Authenticated identity and session values.
//!
//! # Invariants
//! - `Identity` is opaque: core compares and forwards it, never inspects it.
//! - Every session gets a fresh epoch; epochs never repeat in one process.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Opaque authenticated-user handle scoping all store operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Authentication state delivered by an identity watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(Identity),
    SignedOut,
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::SignedIn(identity) => Some(identity),
            Self::SignedOut => None,
        }
    }
}

impl From<Option<Identity>> for AuthState {
    fn from(value: Option<Identity>) -> Self {
        value.map_or(Self::SignedOut, Self::SignedIn)
    }
}

/// Monotonic session counter used to recognize stale remote completions.
pub type SessionEpoch = u64;

/// One signed-in session owned by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Identity,
    pub epoch: SessionEpoch,
}
