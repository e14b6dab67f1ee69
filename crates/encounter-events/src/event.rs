//! Event Types
//!
//! A normalized log event is a type tag plus an open record of fields. The
//! conventional fields (`sourceID`, `targetID`, `ability`, `timestamp`) get
//! typed accessors; everything else is reached through [`Event::get`].

use std::borrow::Cow;
use std::fmt;
use std::io::BufRead;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::entity::EntityId;

/// Routing tag of an event.
///
/// Named types come from the log itself. Internal types are markers that
/// modules synthesize while normalising; they are routed only to hooks that
/// name them explicitly, never to the catch-all route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A type read from the log (e.g. `"damage"`, `"cast"`).
    Named(String),
    /// A marker created inside the analysis (e.g. `encounterStart`).
    Internal(Cow<'static, str>),
}

impl EventType {
    /// Creates a named event type.
    pub fn named(name: impl Into<String>) -> Self {
        EventType::Named(name.into())
    }

    /// Creates an internal marker type.
    pub fn internal(name: impl Into<Cow<'static, str>>) -> Self {
        EventType::Internal(name.into())
    }

    /// Returns the bare name of this type.
    pub fn name(&self) -> &str {
        match self {
            EventType::Named(name) => name,
            EventType::Internal(name) => name,
        }
    }

    /// Returns true for internal marker types.
    pub fn is_internal(&self) -> bool {
        matches!(self, EventType::Internal(_))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Named(name) => write!(f, "{}", name),
            EventType::Internal(name) => write!(f, "<{}>", name),
        }
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        EventType::Named(name.to_string())
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        EventType::Named(name)
    }
}

// Internal markers never leave the process as markers: they serialize as
// their bare name and every deserialized type is a named one.
impl Serialize for EventType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(EventType::Named)
    }
}

/// A single normalized event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Routing tag
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// All other fields of the record
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Event {
    /// Creates an event with no fields.
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self {
            event_type: event_type.into(),
            fields: Map::new(),
        }
    }

    /// Creates an internal marker event.
    pub fn internal(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(EventType::internal(name))
    }

    /// Sets a field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets `sourceID`.
    pub fn with_source(self, id: EntityId) -> Self {
        self.with_field("sourceID", id)
    }

    /// Sets `targetID`.
    pub fn with_target(self, id: EntityId) -> Self {
        self.with_field("targetID", id)
    }

    /// Sets `ability` to a record holding only `guid`.
    pub fn with_ability(self, guid: i64) -> Self {
        let mut ability = Map::new();
        ability.insert("guid".to_string(), Value::from(guid));
        self.with_field("ability", Value::Object(ability))
    }

    /// Sets `timestamp` (milliseconds).
    pub fn with_timestamp(self, timestamp: i64) -> Self {
        self.with_field("timestamp", timestamp)
    }

    /// Returns the raw value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Checks if the event carries a field at all.
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns an integer field.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Returns a numeric field as a float.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn source_id(&self) -> Option<EntityId> {
        self.get_i64("sourceID")
    }

    pub fn target_id(&self) -> Option<EntityId> {
        self.get_i64("targetID")
    }

    /// Returns `ability.guid`.
    pub fn ability_guid(&self) -> Option<i64> {
        self.get("ability")
            .and_then(|ability| ability.get("guid"))
            .and_then(Value::as_i64)
    }

    /// Returns the timestamp in milliseconds.
    pub fn timestamp(&self) -> Option<f64> {
        self.get_f64("timestamp")
    }

    /// Checks if this is an internal marker event.
    pub fn is_internal(&self) -> bool {
        self.event_type.is_internal()
    }

    /// Serializes the event to a single JSON line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes an event from a JSON line.
    pub fn from_jsonl(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Errors that can occur while reading an event log.
#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    /// I/O error reading the log
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A line that is not a valid event
    #[error("line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads a JSONL event log, skipping blank lines.
///
/// Line numbers in errors are 1-based.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<Event>, EventParseError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = Event::from_jsonl(&line).map_err(|source| EventParseError::Json {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_display() {
        assert_eq!(EventType::named("damage").to_string(), "damage");
        assert_eq!(EventType::internal("encounterStart").to_string(), "<encounterStart>");
    }

    #[test]
    fn test_named_and_internal_types_differ() {
        assert_ne!(EventType::named("marker"), EventType::internal("marker"));
        assert!(EventType::internal("marker").is_internal());
        assert!(!EventType::from("marker").is_internal());
    }

    #[test]
    fn test_event_from_jsonl() {
        let line = r#"{"type":"damage","sourceID":1,"targetID":2,"ability":{"guid":10},"amount":100}"#;
        let event = Event::from_jsonl(line).unwrap();

        assert_eq!(event.event_type, EventType::named("damage"));
        assert_eq!(event.source_id(), Some(1));
        assert_eq!(event.target_id(), Some(2));
        assert_eq!(event.ability_guid(), Some(10));
        assert_eq!(event.get_i64("amount"), Some(100));
        assert!(!event.has("type"));
    }

    #[test]
    fn test_event_to_jsonl_keeps_type_key() {
        let event = Event::new("cast").with_source(1).with_ability(7505);
        let value: Value = serde_json::from_str(&event.to_jsonl().unwrap()).unwrap();

        assert_eq!(value, json!({"type": "cast", "sourceID": 1, "ability": {"guid": 7505}}));
    }

    #[test]
    fn test_internal_event_serializes_as_named() {
        let event = Event::internal("encounterEnd").with_timestamp(6000);
        let parsed = Event::from_jsonl(&event.to_jsonl().unwrap()).unwrap();

        assert_eq!(parsed.event_type, EventType::named("encounterEnd"));
        assert_eq!(parsed.timestamp(), Some(6000.0));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let event = Event::new("death");

        assert_eq!(event.source_id(), None);
        assert_eq!(event.ability_guid(), None);
        assert_eq!(event.timestamp(), None);
    }

    #[test]
    fn test_read_jsonl_skips_blank_lines() {
        let log = "{\"type\":\"cast\"}\n\n   \n{\"type\":\"damage\",\"amount\":5}\n";
        let events = read_jsonl(log.as_bytes()).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].get_i64("amount"), Some(5));
    }

    #[test]
    fn test_read_jsonl_reports_line() {
        let log = "{\"type\":\"cast\"}\nnot json\n";
        let err = read_jsonl(log.as_bytes()).unwrap_err();

        match err {
            EventParseError::Json { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_event_without_type_is_rejected() {
        assert!(Event::from_jsonl(r#"{"sourceID":1}"#).is_err());
    }
}
