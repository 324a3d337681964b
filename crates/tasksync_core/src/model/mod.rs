//! Domain model for tracked items and sessions.
//!
//! # Responsibility
//! - Define the item shape shared by store adapters and the view list.
//! - Define identity/session values passed explicitly into store calls.
//!
//! # Invariants
//! - Items are identified by store-assigned `ItemId` only after creation.
//! - No ambient "current user": identity travels as an explicit value.

pub mod item;
pub mod session;
