//! Positioned item domain model.
//!
//! # Responsibility
//! - Define the canonical record ordered inside one scope.
//! - Provide membership helpers over the optional position field.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another item.
//! - `position` presence is the source of truth for list membership.
//! - `created_at` is the stable tiebreak for duplicate positions.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for every list item.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ItemId = Uuid;

/// Stable identifier for the scope an item is listed under.
pub type ScopeId = Uuid;

/// Enumeration direction for ordered sibling queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Position ascending, then creation time ascending.
    Ascending,
    /// Exact reverse of the ascending enumeration.
    Descending,
}

/// Canonical record ordered within one scope.
///
/// An item is *in the list* when `position` is `Some` and *out of the list*
/// when it is `None`. Out-of-list items still exist in storage; they are
/// skipped by ordered queries and never counted toward the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable global ID used for identity and navigation.
    pub uuid: ItemId,
    /// Owning scope. An item belongs to exactly one scope for its lifetime.
    pub scope_uuid: ScopeId,
    /// Integer rank within the scope. `None` means out of the list.
    pub position: Option<i64>,
    /// Unix epoch milliseconds. Tiebreak for duplicate positions.
    pub created_at: i64,
}

impl Item {
    /// Creates a new out-of-list item with a generated stable ID.
    ///
    /// The position is assigned later by the engine's before-create hook.
    pub fn new(scope_uuid: ScopeId) -> Self {
        Self::with_id(Uuid::new_v4(), scope_uuid)
    }

    /// Creates a new item with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(uuid: ItemId, scope_uuid: ScopeId) -> Self {
        Self {
            uuid,
            scope_uuid,
            position: None,
            created_at: now_epoch_ms(),
        }
    }

    /// Returns whether this item currently holds a list position.
    pub fn is_in_list(&self) -> bool {
        self.position.is_some()
    }
}

/// Current wall-clock time as unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
