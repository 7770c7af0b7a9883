//! Storage contract consumed by the list engine.
//!
//! # Responsibility
//! - Define the repository trait both storage shapes implement.
//! - Define the position range predicate used by bulk shifts.
//!
//! # Invariants
//! - `bulk_shift` only ever touches in-list siblings; out-of-list items are
//!   never moved by a shift.
//! - Shift deltas are ±1 in practice; the contract does not assume more.

use crate::config::ConfigError;
use crate::db::DbError;
use crate::model::item::{Item, ItemId, ScopeId, SortDirection};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from item repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Rejected configuration value (e.g. unsafe position field name).
    Config(ConfigError),
    /// The item's scope does not exist in the store.
    ScopeNotFound(ScopeId),
    /// Target item does not exist in the store.
    ItemNotFound(ItemId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Configured position attribute is missing from the expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: String,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::ScopeNotFound(id) => write!(f, "scope not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "item repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid list data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ConfigError> for RepoError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Integer range over positions, matched by bulk shifts.
///
/// Covers the four predicates the engine needs: the open tail above a
/// position, the closed tail at-or-above a position, and the two half-open
/// intervals used when moving an item within the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionRange {
    /// `position > bound`
    Above(i64),
    /// `position >= bound`
    AtOrAbove(i64),
    /// `from <= position < until`
    FromUntil { from: i64, until: i64 },
    /// `after < position <= through`
    AfterThrough { after: i64, through: i64 },
}

impl PositionRange {
    /// Returns whether an in-list position satisfies this range.
    pub fn matches(&self, position: i64) -> bool {
        match *self {
            Self::Above(bound) => position > bound,
            Self::AtOrAbove(bound) => position >= bound,
            Self::FromUntil { from, until } => position >= from && position < until,
            Self::AfterThrough { after, through } => position > after && position <= through,
        }
    }
}

/// Storage contract for positioned items within scopes.
///
/// Implementations exist for the referenced shape (independent rows keyed
/// by a scope foreign key) and the embedded shape (items inside one parent
/// document per scope). The engine treats both uniformly and only consults
/// `is_embedded` where reload semantics differ.
pub trait ItemRepository {
    /// Creates one scope record and returns its id.
    fn create_scope(&self, label: &str) -> RepoResult<ScopeId>;
    /// Persists one new item, including its position and creation time.
    fn insert_item(&self, item: &Item) -> RepoResult<()>;
    /// Removes one item row/entry from the store.
    fn delete_item(&self, item: &Item) -> RepoResult<()>;
    /// Loads one item within a scope.
    fn find_item(&self, scope: ScopeId, id: ItemId) -> RepoResult<Option<Item>>;
    /// All items sharing a list with `item`, including out-of-list ones.
    fn siblings_of(&self, item: &Item) -> RepoResult<Vec<Item>>;
    /// Reads the currently persisted position of one item.
    fn load_position(&self, item: &Item) -> RepoResult<Option<i64>>;
    /// Durably sets or clears the position field of one item.
    fn write_position(&self, item: &Item, position: Option<i64>) -> RepoResult<()>;
    /// Adjusts positions of all in-list siblings satisfying `range` by `delta`.
    fn bulk_shift(&self, scope: ScopeId, range: PositionRange, delta: i64) -> RepoResult<()>;
    /// Re-reads `item` from the store.
    fn reload_item(&self, item: &mut Item) -> RepoResult<()>;
    /// Number of in-list items in `scope`.
    fn count_in_list(&self, scope: ScopeId) -> RepoResult<i64>;
    /// In-list items of `scope` in position order with the creation-time
    /// tiebreak; descending is the exact reverse of ascending.
    fn order_by_position(&self, scope: ScopeId, direction: SortDirection)
        -> RepoResult<Vec<Item>>;
    /// Whether items live inside a parent document for this shape.
    fn is_embedded(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::PositionRange;

    #[test]
    fn above_is_exclusive() {
        let range = PositionRange::Above(3);
        assert!(!range.matches(3));
        assert!(range.matches(4));
    }

    #[test]
    fn at_or_above_is_inclusive() {
        let range = PositionRange::AtOrAbove(3);
        assert!(!range.matches(2));
        assert!(range.matches(3));
    }

    #[test]
    fn from_until_excludes_upper_bound() {
        let range = PositionRange::FromUntil { from: 1, until: 4 };
        assert!(range.matches(1));
        assert!(range.matches(3));
        assert!(!range.matches(4));
    }

    #[test]
    fn after_through_excludes_lower_bound() {
        let range = PositionRange::AfterThrough {
            after: 1,
            through: 4,
        };
        assert!(!range.matches(1));
        assert!(range.matches(2));
        assert!(range.matches(4));
        assert!(!range.matches(5));
    }
}
