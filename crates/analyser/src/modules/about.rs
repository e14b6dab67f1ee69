//! Encounter summary shown at the top of the report.

use encounter_events::Event;
use module_engine::{display_order, BoxError, Declaration, Declare, Dep, HookFilter, Module, Setup, ALL_EVENTS};
use serde::Serialize;
use serde_json::Value;

use super::encounter::{encounter_end, encounter_start, Encounter};

pub struct About {
    encounter: Dep<Encounter>,
    player_name: String,
    job: String,
    pet_count: usize,
    started_at: Option<f64>,
    ended_at: Option<f64>,
    player_events: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AboutOutput<'a> {
    player: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<&'a str>,
    pets: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<f64>,
    events: usize,
    player_events: usize,
}

impl About {
    /// Encounter length as seen by the boundary markers.
    pub fn duration(&self) -> Option<f64> {
        Some(self.ended_at? - self.started_at?)
    }

    /// Number of log events sourced by the player.
    pub fn player_events(&self) -> usize {
        self.player_events
    }
}

impl Module for About {
    fn output(&self) -> Option<Value> {
        let output = AboutOutput {
            player: &self.player_name,
            job: (!self.job.is_empty()).then_some(self.job.as_str()),
            pets: self.pet_count,
            duration_ms: self.duration(),
            events: self.encounter.borrow().event_count(),
            player_events: self.player_events,
        };
        serde_json::to_value(output).ok()
    }
}

impl Declare for About {
    fn declaration() -> Declaration {
        Declaration::new("about")
            .title("About")
            .display_order(display_order::ABOUT)
            .depends_on(["encounter"])
    }

    fn build(setup: &mut Setup<'_, Self>) -> Result<Self, BoxError> {
        let encounter = setup.dependency::<Encounter>("encounter")?;

        setup.add_hook(encounter_start(), |about: &mut Self, event: &Event| {
            about.started_at = event.timestamp();
        });
        setup.add_hook(encounter_end(), |about: &mut Self, event: &Event| {
            about.ended_at = event.timestamp();
        });
        setup.add_hook_filtered(ALL_EVENTS, HookFilter::by_player(), |about: &mut Self, _event: &Event| {
            about.player_events += 1;
        });

        let player = setup.player();
        Ok(Self {
            encounter,
            player_name: player.name.clone(),
            job: player.job.clone(),
            pet_count: player.pets.len(),
            started_at: None,
            ended_at: None,
            player_events: 0,
        })
    }
}
