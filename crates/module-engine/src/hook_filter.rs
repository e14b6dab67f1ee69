//! Registration-time filters with entity and ability shorthands.
//!
//! [`HookFilter`] is what modules pass when they register a hook. It is
//! expanded into a plain [`Filter`] once, at registration, against the
//! analyzed player:
//!
//! | shorthand   | expands to              |
//! |-------------|-------------------------|
//! | `by`        | `sourceID`              |
//! | `to`        | `targetID`              |
//! | `abilityId` | `ability.guid`          |
//!
//! `player` resolves to the player's ID and `pet` to the set of pet IDs.

use encounter_events::Player;
use serde_json::Value;

use crate::filter::{Filter, FilterError, Matcher, Scalar};

/// Who a `by`/`to` shorthand refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef {
    /// The analyzed player
    Player,
    /// Any of the player's pets
    Pets,
    /// Explicit ID matcher
    Matcher(Matcher),
}

impl EntityRef {
    fn expand(&self, player: &Player) -> Matcher {
        match self {
            EntityRef::Player => Matcher::exact(player.id),
            EntityRef::Pets => Matcher::any_of(player.pet_ids()),
            EntityRef::Matcher(matcher) => matcher.clone(),
        }
    }

    fn from_json(key: &str, value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::String(s) if s == "player" => Ok(EntityRef::Player),
            Value::String(s) if s == "pet" => Ok(EntityRef::Pets),
            Value::Object(_) | Value::Null => Err(FilterError::InvalidEntity {
                key: key.to_string(),
            }),
            other => Matcher::from_json(key, other).map(EntityRef::Matcher),
        }
    }
}

/// A filter as written by a module, before shorthand expansion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HookFilter {
    by: Option<EntityRef>,
    to: Option<EntityRef>,
    ability_id: Option<Matcher>,
    fields: Filter,
}

impl HookFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the event source.
    pub fn by(mut self, entity: EntityRef) -> Self {
        self.by = Some(entity);
        self
    }

    /// Restricts the event target.
    pub fn to(mut self, entity: EntityRef) -> Self {
        self.to = Some(entity);
        self
    }

    pub fn by_player() -> Self {
        Self::new().by(EntityRef::Player)
    }

    pub fn by_pets() -> Self {
        Self::new().by(EntityRef::Pets)
    }

    pub fn to_player() -> Self {
        Self::new().to(EntityRef::Player)
    }

    /// Restricts `ability.guid` to one ability.
    pub fn ability(mut self, guid: impl Into<Scalar>) -> Self {
        self.ability_id = Some(Matcher::exact(guid));
        self
    }

    /// Restricts `ability.guid` to any of several abilities.
    pub fn abilities<I, T>(mut self, guids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        self.ability_id = Some(Matcher::any_of(guids));
        self
    }

    /// Adds a raw field matcher.
    pub fn with(mut self, key: impl Into<String>, matcher: Matcher) -> Self {
        self.fields.insert(key, matcher);
        self
    }

    /// Adds a raw exact-equality matcher.
    pub fn field(self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with(key, Matcher::exact(value))
    }

    /// Parses a filter table that may use the `by`, `to` and `abilityId`
    /// shorthands alongside raw field matchers.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        let Value::Object(map) = value else {
            return Err(FilterError::NotARecord);
        };

        let mut filter = HookFilter::new();
        for (key, value) in map {
            match key.as_str() {
                "by" => filter.by = Some(EntityRef::from_json(key, value)?),
                "to" => filter.to = Some(EntityRef::from_json(key, value)?),
                "abilityId" => filter.ability_id = Some(Matcher::from_json(key, value)?),
                _ => filter.fields.insert(key.clone(), Matcher::from_json(key, value)?),
            }
        }
        Ok(filter)
    }

    /// Expands the shorthands into raw field matchers.
    ///
    /// `abilityId` is merged into an existing nested `ability` filter; any
    /// other matcher already stored under `ability` is replaced.
    pub fn expand(&self, player: &Player) -> Filter {
        let mut filter = self.fields.clone();

        if let Some(entity) = &self.to {
            filter.insert("targetID", entity.expand(player));
        }
        if let Some(entity) = &self.by {
            filter.insert("sourceID", entity.expand(player));
        }
        if let Some(guid) = &self.ability_id {
            match filter.get_mut("ability") {
                Some(Matcher::Nested(ability)) => ability.insert("guid", guid.clone()),
                _ => filter.insert("ability", Matcher::nested(Filter::new().with("guid", guid.clone()))),
            }
        }

        filter
    }
}

impl From<Filter> for HookFilter {
    fn from(fields: Filter) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_events::{Event, Pet};
    use serde_json::json;

    fn player() -> Player {
        Player::new(1, "Lyse")
            .with_pet(Pet::new(2, "Garuda-Egi"))
            .with_pet(Pet::new(3, "Carbuncle"))
    }

    #[test]
    fn test_by_player_expands_to_source() {
        let filter = HookFilter::by_player().expand(&player());

        assert_eq!(filter, Filter::new().field("sourceID", 1));
    }

    #[test]
    fn test_to_pets_expands_to_target_set() {
        let filter = HookFilter::new().to(EntityRef::Pets).expand(&player());

        assert_eq!(filter, Filter::new().any_of("targetID", [2, 3]));
    }

    #[test]
    fn test_explicit_entity_is_kept() {
        let filter = HookFilter::new()
            .by(EntityRef::Matcher(Matcher::exact(42)))
            .expand(&player());

        assert_eq!(filter, Filter::new().field("sourceID", 42));
    }

    #[test]
    fn test_ability_id_expands_to_nested_guid() {
        let filter = HookFilter::by_player().abilities([10, 20]).expand(&player());

        assert_eq!(
            filter,
            Filter::new()
                .field("sourceID", 1)
                .nested("ability", Filter::new().any_of("guid", [10, 20]))
        );
    }

    #[test]
    fn test_ability_id_merges_into_existing_ability_filter() {
        let filter = HookFilter::new()
            .with("ability", Matcher::nested(Filter::new().field("name", "Fire")))
            .ability(7505)
            .expand(&player());

        assert_eq!(
            filter,
            Filter::new().nested("ability", Filter::new().field("name", "Fire").field("guid", 7505))
        );
    }

    #[test]
    fn test_no_pets_matches_nothing() {
        let filter = HookFilter::by_pets().expand(&Player::new(1, "Solo"));
        let event = Event::new("damage").with_source(1);

        assert!(!filter.matches(&event));
    }

    #[test]
    fn test_shorthand_and_raw_match_identically() {
        let player = player();
        let shorthand = HookFilter::by_player().ability(7505).expand(&player);
        let raw = Filter::new()
            .field("sourceID", player.id)
            .nested("ability", Filter::new().field("guid", 7505));

        let events = [
            Event::new("cast").with_source(1).with_ability(7505),
            Event::new("cast").with_source(1).with_ability(3577),
            Event::new("cast").with_source(2).with_ability(7505),
            Event::new("cast").with_source(1),
            Event::new("cast").with_ability(7505),
        ];
        for event in &events {
            assert_eq!(shorthand.matches(event), raw.matches(event), "{:?}", event);
        }
    }

    #[test]
    fn test_from_json_with_shorthands() {
        let filter = HookFilter::from_json(&json!({
            "by": "player",
            "to": "pet",
            "abilityId": [7505, 3577],
            "hitType": 2,
        }))
        .unwrap();

        assert_eq!(
            filter,
            HookFilter::by_player()
                .to(EntityRef::Pets)
                .abilities([7505, 3577])
                .field("hitType", 2)
        );
    }

    #[test]
    fn test_from_json_entity_ids() {
        let filter = HookFilter::from_json(&json!({ "by": [4, 5] })).unwrap();

        assert_eq!(filter.expand(&player()), Filter::new().any_of("sourceID", [4, 5]));
    }

    #[test]
    fn test_from_json_rejects_record_entity() {
        let err = HookFilter::from_json(&json!({ "by": { "id": 1 } })).unwrap_err();

        assert_eq!(err, FilterError::InvalidEntity { key: "by".to_string() });
    }
}
