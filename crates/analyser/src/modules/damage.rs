//! Damage dealt by the player and their pets, broken down per ability.

use std::collections::BTreeMap;

use encounter_events::Event;
use module_engine::{BoxError, Declaration, Declare, HookFilter, Module, Setup};
use serde::Serialize;
use serde_json::Value;

/// Which side of the player's group dealt the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    Player,
    Pet,
}

/// Totals for one ability.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AbilityDamage {
    pub guid: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub total: i64,
    pub hits: usize,
}

#[derive(Debug, Default)]
pub struct DamageDone {
    player_total: i64,
    pet_total: i64,
    abilities: BTreeMap<(DamageSource, i64), AbilityDamage>,
}

impl DamageDone {
    pub fn total(&self) -> i64 {
        self.player_total + self.pet_total
    }

    pub fn player_total(&self) -> i64 {
        self.player_total
    }

    pub fn pet_total(&self) -> i64 {
        self.pet_total
    }

    /// Damage from one ability of the given source.
    pub fn ability(&self, source: DamageSource, guid: i64) -> Option<&AbilityDamage> {
        self.abilities.get(&(source, guid))
    }

    fn record(&mut self, source: DamageSource, event: &Event) {
        let amount = event.get_i64("amount").unwrap_or(0);
        match source {
            DamageSource::Player => self.player_total += amount,
            DamageSource::Pet => self.pet_total += amount,
        }

        // Damage without an ability (e.g. auto-attacks in some logs) is
        // grouped under guid 0.
        let guid = event.ability_guid().unwrap_or(0);
        let entry = self.abilities.entry((source, guid)).or_insert_with(|| AbilityDamage {
            guid,
            name: ability_name(event).unwrap_or_default(),
            ..AbilityDamage::default()
        });
        entry.total += amount;
        entry.hits += 1;
    }
}

fn ability_name(event: &Event) -> Option<String> {
    event
        .get("ability")?
        .get("name")?
        .as_str()
        .map(str::to_string)
}

#[derive(Serialize)]
struct SourceBreakdown<'a> {
    source: DamageSource,
    #[serde(flatten)]
    ability: &'a AbilityDamage,
}

impl Module for DamageDone {
    fn output(&self) -> Option<Value> {
        let mut abilities: Vec<SourceBreakdown<'_>> = self
            .abilities
            .iter()
            .map(|(&(source, _), ability)| SourceBreakdown { source, ability })
            .collect();
        // Highest damage first; ties keep key order
        abilities.sort_by(|a, b| b.ability.total.cmp(&a.ability.total));

        Some(serde_json::json!({
            "total": self.total(),
            "player": self.player_total,
            "pets": self.pet_total,
            "abilities": abilities,
        }))
    }
}

impl Declare for DamageDone {
    fn declaration() -> Declaration {
        Declaration::new("damageDone").title("Damage Done")
    }

    fn build(setup: &mut Setup<'_, Self>) -> Result<Self, BoxError> {
        setup.add_hook_filtered("damage", HookFilter::by_player(), |damage: &mut Self, event: &Event| {
            damage.record(DamageSource::Player, event);
        });
        setup.add_hook_filtered("damage", HookFilter::by_pets(), |damage: &mut Self, event: &Event| {
            damage.record(DamageSource::Pet, event);
        });
        Ok(Self::default())
    }
}
