//! Entity context for the analyzed player.

use serde::{Deserialize, Serialize};

/// Numeric actor identifier as it appears in `sourceID` / `targetID`.
pub type EntityId = i64;

/// A pet owned by the analyzed player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
}

impl Pet {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// The player whose log is being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Actor ID of the player
    pub id: EntityId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Job or class name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job: String,
    /// Pets summoned during the encounter
    #[serde(default)]
    pub pets: Vec<Pet>,
}

impl Player {
    /// Creates a player with no pets.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            job: String::new(),
            pets: Vec::new(),
        }
    }

    /// Adds a pet.
    pub fn with_pet(mut self, pet: Pet) -> Self {
        self.pets.push(pet);
        self
    }

    /// Returns the IDs of all pets, in declaration order.
    pub fn pet_ids(&self) -> Vec<EntityId> {
        self.pets.iter().map(|pet| pet.id).collect()
    }

    /// Checks if the ID belongs to one of the player's pets.
    pub fn is_pet(&self, id: EntityId) -> bool {
        self.pets.iter().any(|pet| pet.id == id)
    }

    /// Checks if the ID is the player or one of their pets.
    pub fn owns(&self, id: EntityId) -> bool {
        self.id == id || self.is_pet(id)
    }
}
