//! Sample data fixtures for testing.
//!
//! This module provides ready-made test data for other crates to use.
//! Enable the `test-fixtures` feature to access these helpers.
//!
//! # Example
//!
//! ```ignore
//! // In your Cargo.toml:
//! // [dev-dependencies]
//! // encounter-events = { path = "../encounter-events", features = ["test-fixtures"] }
//!
//! use encounter_events::fixtures;
//!
//! let events = fixtures::sample_events();
//! let player = fixtures::sample_player();
//! ```

use crate::{EntityId, Event, Player};

/// Actor ID of the sample player.
pub const PLAYER_ID: EntityId = 1;
/// Actor ID of the sample player's pet.
pub const PET_ID: EntityId = 2;
/// Actor ID of the sample enemy.
pub const ENEMY_ID: EntityId = 100;

/// Returns sample events from the fixtures file.
///
/// Contains 12 events over six seconds:
/// - 4 casts (3 by the player, 1 by the pet)
/// - 5 damage events (3 by the player for 14700, 1 by the pet for 900,
///   1 by the enemy on the player for 1500)
/// - 1 buff, 1 heal from a third party, 1 enemy death
pub fn sample_events() -> Vec<Event> {
    let jsonl = include_str!("../tests/fixtures/sample_events.jsonl");
    jsonl
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            Event::from_jsonl(l).unwrap_or_else(|e| {
                panic!("Failed to parse event line: {}\nError: {}", l, e)
            })
        })
        .collect()
}

/// Returns the sample player (ID 1, one pet with ID 2).
pub fn sample_player() -> Player {
    let json = include_str!("../tests/fixtures/sample_player.json");
    serde_json::from_str(json).expect("Failed to parse sample_player.json")
}

/// Builds a damage event.
pub fn damage(timestamp: i64, source: EntityId, target: EntityId, guid: i64, amount: i64) -> Event {
    Event::new("damage")
        .with_timestamp(timestamp)
        .with_source(source)
        .with_target(target)
        .with_ability(guid)
        .with_field("amount", amount)
}

/// Builds a cast event.
pub fn cast(timestamp: i64, source: EntityId, target: EntityId, guid: i64) -> Event {
    Event::new("cast")
        .with_timestamp(timestamp)
        .with_source(source)
        .with_target(target)
        .with_ability(guid)
}
