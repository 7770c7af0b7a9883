//! Ordered-list core for records grouped under a scope.
//! This crate is the single source of truth for position invariants.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{configure, current_config, ConfigError, ListConfig};
pub use engine::{ListEngine, ListError, ListResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::item::{Item, ItemId, ScopeId, SortDirection};
pub use repo::embedded::SqliteEmbeddedItemRepository;
pub use repo::item_repo::{ItemRepository, PositionRange, RepoError, RepoResult};
pub use repo::referenced::SqliteItemRepository;
pub use service::list_service::{ListService, NewItem};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
