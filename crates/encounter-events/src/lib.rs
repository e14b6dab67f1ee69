//! Shared event types and serialization for encounter analysis.
//!
//! This crate contains pure data structures with no analysis logic.
//! It is a dependency for all other crates in the workspace.

pub mod entity;
pub mod event;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

// Re-export entity types
pub use entity::{EntityId, Pet, Player};

// Re-export event types
pub use event::{read_jsonl, Event, EventParseError, EventType};
