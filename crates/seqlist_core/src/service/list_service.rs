//! Lifecycle hook host for positioned items.
//!
//! # Responsibility
//! - Run the before-create hook (position assignment) when an item is
//!   persisted and the after-destroy hook (tail compaction) when one is
//!   removed.
//! - Expose the engine for user-invoked operations.
//!
//! # Invariants
//! - Hooks are the only auto-fired entry points; everything else on the
//!   engine is invoked explicitly by the caller.

use crate::config::ListConfig;
use crate::engine::{ListEngine, ListResult};
use crate::model::item::{Item, ScopeId};
use crate::repo::item_repo::ItemRepository;
use log::debug;

/// Caller-supplied fields for a new item.
///
/// A pre-supplied `position` is honored unchanged, duplicates included; a
/// pre-supplied `created_at` backdates the tiebreak (import paths).
#[derive(Debug, Clone, Copy, Default)]
pub struct NewItem {
    pub position: Option<i64>,
    pub created_at: Option<i64>,
}

/// Hook host wiring engine callbacks around item persistence.
pub struct ListService<R: ItemRepository> {
    engine: ListEngine<R>,
}

impl<R: ItemRepository> ListService<R> {
    /// Creates a service using the process-wide default configuration.
    pub fn new(repo: R) -> Self {
        Self {
            engine: ListEngine::new(repo),
        }
    }

    /// Creates a service with an explicit configuration.
    pub fn with_config(repo: R, config: ListConfig) -> Self {
        Self {
            engine: ListEngine::with_config(repo, config),
        }
    }

    /// Returns the engine for user-invoked list operations.
    pub fn engine(&self) -> &ListEngine<R> {
        &self.engine
    }

    /// Creates one scope record.
    pub fn create_scope(&self, label: &str) -> ListResult<ScopeId> {
        Ok(self.engine.repo().create_scope(label)?)
    }

    /// Creates one item, firing the before-create hook.
    pub fn create_item(&self, scope: ScopeId, new_item: NewItem) -> ListResult<Item> {
        let mut item = Item::new(scope);
        if let Some(created_at) = new_item.created_at {
            item.created_at = created_at;
        }
        item.position = new_item.position;

        self.engine.assign_position(&mut item)?;
        self.engine.repo().insert_item(&item)?;
        debug!(
            "event=create_item module=service status=ok scope={} item={} position={:?}",
            scope, item.uuid, item.position
        );
        Ok(item)
    }

    /// Destroys one item, firing the after-destroy hook.
    ///
    /// The compaction uses the position the in-hand item held at destroy
    /// time; an item previously taken out of the list shifts nothing.
    pub fn destroy_item(&self, item: &Item) -> ListResult<()> {
        self.engine.repo().delete_item(item)?;
        self.engine.compact_after_destroy(item)?;
        debug!(
            "event=destroy_item module=service status=ok scope={} item={}",
            item.scope_uuid, item.uuid
        );
        Ok(())
    }
}
