//! Position-invariant maintenance engine.
//!
//! # Responsibility
//! - Keep per-scope positions contiguous from the configured base across
//!   create, destroy, removal, and reordering.
//! - Provide membership predicates, navigation, and ordered queries.
//!
//! # Invariants
//! - After any successful operation, in-list positions of a scope are
//!   exactly `{base .. base+k-1}` for `k` in-list items, unless the caller
//!   pre-supplied an explicit duplicate position at create time.
//! - Out-of-list items are never shifted and never enumerated.
//! - Each mutation is a write-item/bulk-shift pair; the pair is not wrapped
//!   in a transaction here, and a crash between the two requires external
//!   repair.

use crate::config::{self, ListConfig};
use crate::model::item::{Item, ScopeId, SortDirection};
use crate::repo::item_repo::{ItemRepository, PositionRange, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ListResult<T> = Result<T, ListError>;

/// Errors from list engine operations.
#[derive(Debug)]
pub enum ListError {
    /// The item's scope cannot be resolved (misconfiguration or deletion).
    NoScope(ScopeId),
    /// Underlying storage failure, propagated unchanged.
    Storage(RepoError),
}

impl Display for ListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoScope(id) => write!(f, "item has no resolvable scope: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ListError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoScope(_) => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for ListError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ScopeNotFound(scope) => Self::NoScope(scope),
            other => Self::Storage(other),
        }
    }
}

/// List maintenance engine over one storage shape.
///
/// The engine captures its configuration at construction; later changes to
/// the process default only affect engines built afterwards.
pub struct ListEngine<R: ItemRepository> {
    repo: R,
    config: ListConfig,
}

impl<R: ItemRepository> ListEngine<R> {
    /// Creates an engine using the process-wide default configuration.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, config::current_config())
    }

    /// Creates an engine with an explicit configuration.
    pub fn with_config(repo: R, config: ListConfig) -> Self {
        Self { repo, config }
    }

    /// Returns the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns the configured position attribute name.
    pub fn position_field(&self) -> &str {
        &self.config.position_field_name
    }

    /// Returns the configured base index.
    pub fn base(&self) -> i64 {
        self.config.start_list_at
    }

    /// Next free slot in `scope`: base plus the current in-list count.
    pub fn next_position(&self, scope: ScopeId) -> ListResult<i64> {
        let count = self.repo.count_in_list(scope)?;
        Ok(self.config.start_list_at + count)
    }

    /// Before-create hook body.
    ///
    /// Assigns the next free position when none was supplied. A caller-set
    /// explicit position is honored unchanged; the resulting duplicate is
    /// tolerated and resolved by the creation-time tiebreak.
    pub fn assign_position(&self, item: &mut Item) -> ListResult<()> {
        if item.position.is_none() {
            item.position = Some(self.next_position(item.scope_uuid)?);
        }
        Ok(())
    }

    /// After-destroy hook body.
    ///
    /// Compacts the tail above the destroyed item's former position. Items
    /// already out of the list at destruction time cause no shifts.
    pub fn compact_after_destroy(&self, item: &Item) -> ListResult<()> {
        let Some(position) = item.position else {
            return Ok(());
        };
        self.repo
            .bulk_shift(item.scope_uuid, PositionRange::Above(position), -1)?;
        debug!(
            "event=compact_after_destroy module=engine status=ok scope={} item={} position={}",
            item.scope_uuid, item.uuid, position
        );
        Ok(())
    }

    /// Takes the item out of the list and compacts the remainder.
    ///
    /// The item survives with its position absent; calling this on an item
    /// already out of the list is a no-op.
    pub fn remove_from_list(&self, item: &mut Item) -> ListResult<()> {
        let Some(position) = self.repo.load_position(item)? else {
            item.position = None;
            return Ok(());
        };

        self.repo.write_position(item, None)?;
        item.position = None;
        self.repo
            .bulk_shift(item.scope_uuid, PositionRange::Above(position), -1)?;
        debug!(
            "event=remove_from_list module=engine status=ok scope={} item={} position={}",
            item.scope_uuid, item.uuid, position
        );
        Ok(())
    }

    /// Places the item at `target`, shifting the affected interval by one.
    ///
    /// Targets are clamped to the meaningful range: `[base, base+count-1]`
    /// for items already in the list, `[base, base+count]` for items
    /// re-entering it. Landing on the current position is a no-op with no
    /// writes and no shifts.
    pub fn insert_at(&self, item: &mut Item, target: i64) -> ListResult<()> {
        let scope = item.scope_uuid;
        let base = self.config.start_list_at;
        let count = self.repo.count_in_list(scope)?;
        let current = self.repo.load_position(item)?;

        match current {
            Some(old) => {
                let max = (base + count - 1).max(base);
                let new = target.clamp(base, max);
                if new == old {
                    return Ok(());
                }
                if new < old {
                    self.repo.bulk_shift(
                        scope,
                        PositionRange::FromUntil {
                            from: new,
                            until: old,
                        },
                        1,
                    )?;
                } else {
                    self.repo.bulk_shift(
                        scope,
                        PositionRange::AfterThrough {
                            after: old,
                            through: new,
                        },
                        -1,
                    )?;
                }
                self.repo.write_position(item, Some(new))?;
                item.position = Some(new);
                debug!(
                    "event=insert_at module=engine status=ok scope={} item={} from={} to={}",
                    scope, item.uuid, old, new
                );
            }
            None => {
                let new = target.clamp(base, base + count);
                self.repo
                    .bulk_shift(scope, PositionRange::AtOrAbove(new), 1)?;
                self.repo.write_position(item, Some(new))?;
                item.position = Some(new);
                debug!(
                    "event=insert_at module=engine status=ok scope={} item={} from=out_of_list to={}",
                    scope, item.uuid, new
                );
            }
        }

        // Embedded documents are rewritten wholesale by the shift, so the
        // parent is already current; referenced rows mutate out-of-band
        // from the item in hand.
        if !self.repo.is_embedded() {
            self.repo.reload_item(item)?;
        }
        Ok(())
    }

    /// Whether the item currently holds a position.
    pub fn in_list(&self, item: &Item) -> bool {
        item.is_in_list()
    }

    /// Whether the item sits at the base of its scope.
    pub fn is_first(&self, item: &Item) -> bool {
        item.position == Some(self.config.start_list_at)
    }

    /// Whether the item sits at the end of its scope.
    pub fn is_last(&self, item: &Item) -> ListResult<bool> {
        let Some(position) = item.position else {
            return Ok(false);
        };
        let count = self.repo.count_in_list(item.scope_uuid)?;
        Ok(position == self.config.start_list_at + count - 1)
    }

    /// The in-list sibling one position after `item`, if any.
    pub fn higher_item(&self, item: &Item) -> ListResult<Option<Item>> {
        self.neighbor(item, 1)
    }

    /// Alias of [`higher_item`](Self::higher_item).
    pub fn next_item(&self, item: &Item) -> ListResult<Option<Item>> {
        self.higher_item(item)
    }

    /// The in-list sibling one position before `item`, if any.
    pub fn lower_item(&self, item: &Item) -> ListResult<Option<Item>> {
        self.neighbor(item, -1)
    }

    /// Alias of [`lower_item`](Self::lower_item).
    pub fn previous_item(&self, item: &Item) -> ListResult<Option<Item>> {
        self.lower_item(item)
    }

    /// In-list siblings of `scope` in position order.
    pub fn order_by_position(
        &self,
        scope: ScopeId,
        direction: SortDirection,
    ) -> ListResult<Vec<Item>> {
        Ok(self.repo.order_by_position(scope, direction)?)
    }

    fn neighbor(&self, item: &Item, offset: i64) -> ListResult<Option<Item>> {
        let Some(position) = item.position else {
            return Ok(None);
        };
        let wanted = position + offset;
        let siblings = self.repo.siblings_of(item)?;
        Ok(siblings
            .into_iter()
            .find(|sibling| sibling.position == Some(wanted)))
    }
}
