//! Structural event filters.
//!
//! A [`Filter`] maps field names to [`Matcher`]s and matches an event when
//! every entry matches (AND semantics). The kind of each matcher is fixed
//! when the filter is built, so matching never has to inspect the shape of
//! the filter itself.

use std::borrow::Cow;
use std::collections::BTreeMap;

use encounter_events::Event;
use serde_json::{Map, Value};

/// A single comparable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    /// Integer above `i64::MAX`
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Converts a JSON value, rejecting null, arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Scalar::Int)
                .or_else(|| n.as_u64().map(Scalar::UInt))
                .or_else(|| n.as_f64().map(Scalar::Float)),
            Value::String(s) => Some(Scalar::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Exact equality against an event value. Integers and floats compare
    /// numerically, so `10` matches `10.0`. Two integers always compare
    /// exactly.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Scalar::Bool(b), Value::Bool(v)) => b == v,
            (Scalar::Str(s), Value::String(v)) => s == v,
            (Scalar::Int(i), Value::Number(n)) => match n.as_i64() {
                Some(v) => *i == v,
                None if n.is_f64() => n.as_f64() == Some(*i as f64),
                None => false,
            },
            (Scalar::UInt(u), Value::Number(n)) => match n.as_u64() {
                Some(v) => *u == v,
                None if n.is_f64() => n.as_f64() == Some(*u as f64),
                None => false,
            },
            (Scalar::Float(f), Value::Number(n)) => n.as_f64() == Some(*f),
            _ => false,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar::Int(v.into())
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Scalar::UInt(v), Scalar::Int)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

/// How one filter entry is compared against the event's field.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Exact equality
    Scalar(Scalar),
    /// Equal to any member of the set
    AnyOf(Vec<Scalar>),
    /// Recursive match into a record-valued field
    Nested(Filter),
}

impl Matcher {
    /// Exact-equality matcher.
    pub fn exact(value: impl Into<Scalar>) -> Self {
        Matcher::Scalar(value.into())
    }

    /// Set-membership matcher.
    pub fn any_of<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Matcher::AnyOf(values.into_iter().map(Into::into).collect())
    }

    /// Nested-record matcher.
    pub fn nested(filter: Filter) -> Self {
        Matcher::Nested(filter)
    }

    /// Builds a matcher from a JSON value: arrays become sets, objects become
    /// nested filters, everything else an exact match.
    pub fn from_json(key: &str, value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    Scalar::from_value(item).ok_or_else(|| FilterError::NonScalarInSet {
                        key: key.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Matcher::AnyOf),
            Value::Object(map) => Filter::from_map(map).map(Matcher::Nested),
            Value::Null => Err(FilterError::NullMatcher {
                key: key.to_string(),
            }),
            scalar => Scalar::from_value(scalar)
                .map(Matcher::Scalar)
                .ok_or_else(|| FilterError::NullMatcher {
                    key: key.to_string(),
                }),
        }
    }

    /// Compares against a present event value.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Scalar(scalar) => scalar.matches(value),
            Matcher::AnyOf(set) => set.iter().any(|scalar| scalar.matches(value)),
            Matcher::Nested(filter) => match value {
                Value::Object(record) => filter.matches_record(record),
                _ => false,
            },
        }
    }
}

/// A conjunction of field matchers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    entries: BTreeMap<String, Matcher>,
}

impl Filter {
    /// Creates an empty filter, which matches every event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-equality entry.
    pub fn field(self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with(key, Matcher::exact(value))
    }

    /// Adds a set-membership entry.
    pub fn any_of<I, T>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        self.with(key, Matcher::any_of(values))
    }

    /// Adds a nested entry.
    pub fn nested(self, key: impl Into<String>, filter: Filter) -> Self {
        self.with(key, Matcher::nested(filter))
    }

    /// Adds an entry, replacing any previous matcher for the key.
    pub fn with(mut self, key: impl Into<String>, matcher: Matcher) -> Self {
        self.insert(key, matcher);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, matcher: Matcher) {
        self.entries.insert(key.into(), matcher);
    }

    pub fn get(&self, key: &str) -> Option<&Matcher> {
        self.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Matcher> {
        self.entries.get_mut(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Matcher)> {
        self.entries.iter().map(|(key, matcher)| (key.as_str(), matcher))
    }

    /// Parses a filter from a JSON object.
    pub fn from_json(value: &Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(FilterError::NotARecord),
        }
    }

    pub(crate) fn from_map(map: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut filter = Filter::new();
        for (key, value) in map {
            filter.insert(key.clone(), Matcher::from_json(key, value)?);
        }
        Ok(filter)
    }

    /// Checks the filter against an event.
    ///
    /// The `type` key is answered from the event's routing tag; internal
    /// markers have no matchable type.
    pub fn matches(&self, event: &Event) -> bool {
        self.entries.iter().all(|(key, matcher)| {
            match event_field(event, key) {
                Some(value) => matcher.matches(&value),
                None => false,
            }
        })
    }

    /// Checks the filter against a plain record.
    pub fn matches_record(&self, record: &Map<String, Value>) -> bool {
        self.entries.iter().all(|(key, matcher)| match record.get(key) {
            Some(value) => matcher.matches(value),
            None => false,
        })
    }
}

/// Free-function form of [`Filter::matches`].
pub fn matches(event: &Event, filter: &Filter) -> bool {
    filter.matches(event)
}

fn event_field<'a>(event: &'a Event, key: &str) -> Option<Cow<'a, Value>> {
    if key == "type" {
        if event.is_internal() {
            return None;
        }
        return Some(Cow::Owned(Value::String(event.event_type.name().to_string())));
    }
    event.get(key).map(Cow::Borrowed)
}

/// Errors that can occur when building a filter from data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The filter (or a nested filter) is not an object
    #[error("filter must be a table of field matchers")]
    NotARecord,
    /// A set contains an array, object or null
    #[error("set for `{key}` may only contain scalars")]
    NonScalarInSet { key: String },
    /// A matcher is null
    #[error("matcher for `{key}` is null")]
    NullMatcher { key: String },
    /// A `by`/`to` shorthand has an unusable value
    #[error("`{key}` must be \"player\", \"pet\", an ID, or a list of IDs")]
    InvalidEntity { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ability_event(guid: i64) -> Event {
        Event::new("cast").with_source(1).with_ability(guid)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::new();

        assert!(filter.matches(&Event::new("damage")));
        assert!(filter.matches(&Event::internal("marker")));
        assert!(filter.matches(&ability_event(1)));
    }

    #[test]
    fn test_missing_key_fails() {
        let filter = Filter::new().field("targetID", 2);

        assert!(!filter.matches(&Event::new("damage").with_source(2)));
    }

    #[test]
    fn test_scalar_equality() {
        let filter = Filter::new().field("sourceID", 1);

        assert!(filter.matches(&Event::new("damage").with_source(1)));
        assert!(!filter.matches(&Event::new("damage").with_source(2)));
    }

    #[test]
    fn test_int_matches_float_value() {
        let filter = Filter::new().field("amount", 10);

        assert!(filter.matches(&Event::new("damage").with_field("amount", 10.0)));
        assert!(!filter.matches(&Event::new("damage").with_field("amount", 10.5)));
    }

    #[test]
    fn test_large_ids_compare_exactly() {
        let big = u64::MAX - 1;
        let filter = Filter::from_json(&json!({ "sourceID": big })).unwrap();

        assert_eq!(filter.get("sourceID"), Some(&Matcher::Scalar(Scalar::UInt(big))));
        assert!(filter.matches(&Event::new("damage").with_field("sourceID", big)));
        // equal once both are rounded to f64
        assert!(!filter.matches(&Event::new("damage").with_field("sourceID", u64::MAX)));
        assert!(!filter.matches(&Event::new("damage").with_field("sourceID", -1)));

        let exact = Filter::new().field("sourceID", i64::MAX);
        assert!(!exact.matches(&Event::new("damage").with_field("sourceID", i64::MAX as u64 + 1)));
        assert_eq!(Scalar::from(7u64), Scalar::Int(7));
    }

    #[test]
    fn test_string_does_not_equal_number() {
        let filter = Filter::new().field("sourceID", "1");

        assert!(!filter.matches(&Event::new("damage").with_source(1)));
    }

    #[test]
    fn test_nested_any_of_guid() {
        let filter = Filter::new().nested("ability", Filter::new().any_of("guid", [10, 20]));

        assert!(filter.matches(&ability_event(10)));
        assert!(filter.matches(&ability_event(20)));
        assert!(!filter.matches(&ability_event(30)));
        assert!(!filter.matches(&Event::new("cast").with_source(1)));
    }

    #[test]
    fn test_nested_against_non_record_is_no_match() {
        let filter = Filter::new().nested("ability", Filter::new().field("guid", 10));
        let event = Event::new("cast").with_field("ability", 10);

        assert!(!filter.matches(&event));
    }

    #[test]
    fn test_empty_nested_requires_record() {
        let filter = Filter::new().nested("ability", Filter::new());

        assert!(filter.matches(&ability_event(1)));
        assert!(!filter.matches(&Event::new("cast").with_field("ability", "x")));
    }

    #[test]
    fn test_conjunction() {
        let filter = Filter::new().field("sourceID", 1).field("targetID", 2);

        assert!(filter.matches(&Event::new("damage").with_source(1).with_target(2)));
        assert!(!filter.matches(&Event::new("damage").with_source(1).with_target(3)));
    }

    #[test]
    fn test_type_key_uses_routing_tag() {
        let filter = Filter::new().any_of("type", ["damage", "heal"]);

        assert!(filter.matches(&Event::new("heal")));
        assert!(!filter.matches(&Event::new("cast")));
        assert!(!filter.matches(&Event::internal("damage")));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let filter = Filter::new().any_of("sourceID", Vec::<i64>::new());

        assert!(!filter.matches(&Event::new("damage").with_source(1)));
    }

    #[test]
    fn test_from_json() {
        let filter = Filter::from_json(&json!({
            "sourceID": 1,
            "ability": { "guid": [10, 20] },
            "hitType": "crit",
        }))
        .unwrap();

        assert_eq!(
            filter,
            Filter::new()
                .field("sourceID", 1)
                .nested("ability", Filter::new().any_of("guid", [10, 20]))
                .field("hitType", "crit")
        );
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        assert_eq!(Filter::from_json(&json!([1, 2])), Err(FilterError::NotARecord));
        assert_eq!(
            Filter::from_json(&json!({"guid": [1, [2]]})),
            Err(FilterError::NonScalarInSet { key: "guid".to_string() })
        );
        assert_eq!(
            Filter::from_json(&json!({"guid": null})),
            Err(FilterError::NullMatcher { key: "guid".to_string() })
        );
    }

    #[test]
    fn test_free_function_matches() {
        assert!(matches(&Event::new("damage"), &Filter::new()));
    }
}
