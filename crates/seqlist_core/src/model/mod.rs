//! Domain model for positioned list items.
//!
//! # Responsibility
//! - Define the canonical item record shared by both storage shapes.
//! - Keep position/membership semantics in one place.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - List membership is represented by `position` presence, not deletion.

pub mod item;
