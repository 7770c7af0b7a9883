//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the list engine consumes.
//! - Isolate SQLite query and document details from engine algorithms.
//!
//! # Invariants
//! - Both shapes expose the same contract; the engine branches only on
//!   `is_embedded` where post-mutation reload semantics differ.
//! - Repository APIs return semantic errors (`ScopeNotFound`,
//!   `ItemNotFound`) in addition to DB transport errors.

pub mod embedded;
pub mod item_repo;
pub mod referenced;
