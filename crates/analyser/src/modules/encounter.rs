//! Encounter bounds.
//!
//! Brackets the event stream with internal `encounterStart` and
//! `encounterEnd` markers so other modules can hook the fight's boundaries
//! without inspecting the first and last events themselves.

use encounter_events::{Event, EventType};
use module_engine::{display_order, BoxError, Declaration, Declare, Module, Setup};
use serde_json::Value;

pub const ENCOUNTER_START: &str = "encounterStart";
pub const ENCOUNTER_END: &str = "encounterEnd";

/// Routing key of the start marker.
pub fn encounter_start() -> EventType {
    EventType::internal(ENCOUNTER_START)
}

/// Routing key of the end marker.
pub fn encounter_end() -> EventType {
    EventType::internal(ENCOUNTER_END)
}

#[derive(Debug, Default)]
pub struct Encounter {
    start: Option<f64>,
    end: Option<f64>,
    event_count: usize,
}

impl Encounter {
    /// Timestamp of the first event, if any event had one.
    pub fn start(&self) -> Option<f64> {
        self.start
    }

    /// Timestamp of the last event, if any event had one.
    pub fn end(&self) -> Option<f64> {
        self.end
    }

    /// Length of the encounter in milliseconds.
    pub fn duration(&self) -> Option<f64> {
        Some(self.end? - self.start?)
    }

    /// Number of log events, markers excluded.
    pub fn event_count(&self) -> usize {
        self.event_count
    }
}

fn marker(name: &'static str, timestamp: Option<&Value>) -> Event {
    let event = Event::internal(name);
    match timestamp {
        Some(timestamp) => event.with_field("timestamp", timestamp.clone()),
        None => event,
    }
}

impl Module for Encounter {
    fn normalise(&mut self, events: Vec<Event>) -> Vec<Event> {
        let first = events.iter().find_map(|e| e.get("timestamp"));
        let last = events.iter().rev().find_map(|e| e.get("timestamp"));

        self.event_count = events.len();
        self.start = first.and_then(Value::as_f64);
        self.end = last.and_then(Value::as_f64);

        let start = marker(ENCOUNTER_START, first);
        let end = marker(ENCOUNTER_END, last);

        let mut normalised = Vec::with_capacity(events.len() + 2);
        normalised.push(start);
        normalised.extend(events);
        normalised.push(end);
        normalised
    }
}

impl Declare for Encounter {
    fn declaration() -> Declaration {
        Declaration::new("encounter")
            .title("Encounter")
            .display_order(display_order::BOTTOM)
    }

    fn build(_setup: &mut Setup<'_, Self>) -> Result<Self, BoxError> {
        Ok(Self::default())
    }
}
