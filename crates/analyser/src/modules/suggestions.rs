//! Improvement suggestions derived from other modules' results.

use module_engine::{display_order, BoxError, Declaration, Declare, Dep, Module, Setup};
use serde::Serialize;
use serde_json::Value;

use super::casts::Casts;
use super::damage::DamageDone;

/// Share of total damage above which pet damage is called out.
pub const PET_SHARE_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Major,
    Medium,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub severity: Severity,
    pub content: String,
}

impl Suggestion {
    fn new(severity: Severity, content: impl Into<String>) -> Self {
        Self {
            severity,
            content: content.into(),
        }
    }
}

pub struct Suggestions {
    casts: Dep<Casts>,
    damage: Dep<DamageDone>,
}

impl Suggestions {
    /// Suggestions for the current state of the dependencies, most severe
    /// first.
    pub fn collect(&self) -> Vec<Suggestion> {
        let casts = self.casts.borrow();
        let damage = self.damage.borrow();
        let mut suggestions = Vec::new();

        if damage.total() == 0 {
            let content = if casts.total() == 0 {
                "No casts or damage were recorded for this player. Check that the right player was selected."
            } else {
                "Casts were recorded but no damage was dealt."
            };
            suggestions.push(Suggestion::new(Severity::Major, content));
        } else {
            let pet_share = damage.pet_total() as f64 / damage.total() as f64;
            if pet_share > PET_SHARE_THRESHOLD {
                suggestions.push(Suggestion::new(
                    Severity::Medium,
                    format!(
                        "Pets dealt {:.0}% of your damage. Spend more time casting your own abilities.",
                        pet_share * 100.0
                    ),
                ));
            }
        }

        suggestions.sort_by_key(|s| s.severity);
        suggestions
    }
}

impl Module for Suggestions {
    fn output(&self) -> Option<Value> {
        serde_json::to_value(self.collect()).ok()
    }
}

impl Declare for Suggestions {
    fn declaration() -> Declaration {
        Declaration::new("suggestions")
            .title("Suggestions")
            .display_order(display_order::SUGGESTIONS)
            .depends_on(["casts", "damageDone"])
    }

    fn build(setup: &mut Setup<'_, Self>) -> Result<Self, BoxError> {
        Ok(Self {
            casts: setup.dependency("casts")?,
            damage: setup.dependency("damageDone")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_events::fixtures::{self, cast, damage, ENEMY_ID, PET_ID, PLAYER_ID};
    use encounter_events::Event;
    use module_engine::{Analysis, ModuleDescriptor};

    fn suggestions_for(events: Vec<Event>) -> Vec<Suggestion> {
        let descriptors = vec![
            ModuleDescriptor::of::<Suggestions>(),
            ModuleDescriptor::of::<Casts>(),
            ModuleDescriptor::of::<DamageDone>(),
        ];
        let analysis = Analysis::new(fixtures::sample_player(), descriptors).unwrap();
        let suggestions = analysis.module::<Suggestions>("suggestions").unwrap();
        analysis.run(events).unwrap();
        let collected = suggestions.borrow().collect();
        collected
    }

    #[test]
    fn test_sample_has_no_suggestions() {
        assert!(suggestions_for(fixtures::sample_events()).is_empty());
    }

    #[test]
    fn test_no_damage() {
        let suggestions = suggestions_for(Vec::new());

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::Major);
        assert!(suggestions[0].content.contains("No casts or damage"));
    }

    #[test]
    fn test_casts_without_damage() {
        let suggestions = suggestions_for(vec![cast(0, PLAYER_ID, ENEMY_ID, 7505)]);

        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].content.contains("no damage"));
    }

    #[test]
    fn test_pet_heavy_damage() {
        let events = vec![
            damage(0, PLAYER_ID, ENEMY_ID, 7505, 100),
            damage(10, PET_ID, ENEMY_ID, 16548, 300),
        ];
        let suggestions = suggestions_for(events);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].severity, Severity::Medium);
        assert!(suggestions[0].content.contains("75%"));
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let value = serde_json::to_value(Suggestion::new(Severity::Minor, "x")).unwrap();

        assert_eq!(value["severity"], "minor");
    }
}
