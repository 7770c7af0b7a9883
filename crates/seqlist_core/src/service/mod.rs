//! Core use-case services.
//!
//! # Responsibility
//! - Bind the engine's lifecycle hooks around item persistence.
//! - Keep host layers decoupled from storage and shift details.

pub mod list_service;
