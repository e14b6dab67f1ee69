//! Counting modules declared in configuration.
//!
//! Each `[[counters]]` entry becomes a module that counts, or sums a field
//! of, the events matching its types and filter.

use encounter_events::Event;
use module_engine::{Declaration, HookFilter, Module, ModuleDescriptor, Setup};
use serde_json::{json, Value};

use crate::config::{CounterConfig, SettingsError};

#[derive(Debug, Default)]
pub struct Counter {
    sum_field: Option<String>,
    count: usize,
    sum: f64,
}

impl Counter {
    /// Number of matching events.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Sum of the configured field over matching events.
    pub fn sum(&self) -> f64 {
        self.sum
    }

    fn record(&mut self, event: &Event) {
        self.count += 1;
        if let Some(field) = &self.sum_field {
            self.sum += event.get_f64(field).unwrap_or(0.0);
        }
    }
}

impl Module for Counter {
    fn output(&self) -> Option<Value> {
        let output = match &self.sum_field {
            Some(field) => json!({ "count": self.count, "field": field, "sum": self.sum }),
            None => json!({ "count": self.count }),
        };
        Some(output)
    }
}

/// Builds the module descriptor for a configured counter.
///
/// The filter is parsed here so a malformed table is reported before any
/// module is built.
pub fn descriptor(config: &CounterConfig) -> Result<ModuleDescriptor, SettingsError> {
    let filter = match &config.filter {
        Some(table) => HookFilter::from_json(table).map_err(|source| SettingsError::Filter {
            handle: config.handle.clone(),
            source,
        })?,
        None => HookFilter::new(),
    };

    let mut declaration = Declaration::new(config.handle.clone()).display_order(config.display_order);
    if let Some(title) = &config.title {
        declaration = declaration.title(title.clone());
    }

    let events = config.events.clone();
    let sum_field = config.sum_field.clone();
    Ok(ModuleDescriptor::new(declaration, move |setup: &mut Setup<'_, Counter>| {
        setup.add_hook_filtered(events, filter, |counter: &mut Counter, event: &Event| {
            counter.record(event);
        });
        Ok(Counter {
            sum_field,
            ..Counter::default()
        })
    }))
}
