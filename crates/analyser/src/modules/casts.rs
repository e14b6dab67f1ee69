//! Player casts per ability.

use std::collections::BTreeMap;

use encounter_events::Event;
use module_engine::{BoxError, Declaration, Declare, HookFilter, Module, Setup};
use serde_json::{json, Value};

#[derive(Debug, Default)]
pub struct Casts {
    by_ability: BTreeMap<i64, usize>,
    unknown: usize,
}

impl Casts {
    /// Casts of one ability.
    pub fn count(&self, guid: i64) -> usize {
        self.by_ability.get(&guid).copied().unwrap_or(0)
    }

    /// All player casts, including those without an ability.
    pub fn total(&self) -> usize {
        self.by_ability.values().sum::<usize>() + self.unknown
    }

    pub fn by_ability(&self) -> &BTreeMap<i64, usize> {
        &self.by_ability
    }
}

impl Module for Casts {
    fn output(&self) -> Option<Value> {
        let by_ability: BTreeMap<String, usize> = self
            .by_ability
            .iter()
            .map(|(guid, count)| (guid.to_string(), *count))
            .collect();
        Some(json!({
            "total": self.total(),
            "byAbility": by_ability,
        }))
    }
}

impl Declare for Casts {
    fn declaration() -> Declaration {
        Declaration::new("casts").title("Casts")
    }

    fn build(setup: &mut Setup<'_, Self>) -> Result<Self, BoxError> {
        setup.add_hook_filtered("cast", HookFilter::by_player(), |casts: &mut Self, event: &Event| {
            match event.ability_guid() {
                Some(guid) => *casts.by_ability.entry(guid).or_default() += 1,
                None => {
                    tracing::debug!("Cast without an ability guid");
                    casts.unknown += 1;
                }
            }
        });
        Ok(Self::default())
    }
}
