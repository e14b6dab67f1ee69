//! Per-module hook registry and dispatch.
//!
//! Hooks are stored once and indexed by route. A route is either a concrete
//! [`EventType`] or the catch-all [`HookKey::All`]. Dispatching an event
//! visits catch-all hooks first (skipped for internal markers), then the
//! hooks for the event's own type, each group in registration order. A hook
//! reachable through both routes fires once.

use std::collections::HashMap;
use std::fmt;

use encounter_events::{Event, EventType};

use crate::filter::Filter;

/// Boxed error returned by hook callbacks and module constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reserved event type name that routes every non-internal event.
pub const ALL_EVENTS: &str = "all";

/// Return types accepted from hook callbacks.
pub trait HookResult {
    fn into_hook_result(self) -> Result<(), BoxError>;
}

impl HookResult for () {
    fn into_hook_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> HookResult for Result<(), E> {
    fn into_hook_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// Route a hook is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookKey {
    /// Every non-internal event
    All,
    /// One event type
    Type(EventType),
}

impl From<&str> for HookKey {
    fn from(name: &str) -> Self {
        if name == ALL_EVENTS {
            HookKey::All
        } else {
            HookKey::Type(EventType::named(name))
        }
    }
}

impl From<String> for HookKey {
    fn from(name: String) -> Self {
        HookKey::from(name.as_str())
    }
}

impl From<EventType> for HookKey {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Named(ref name) if name == ALL_EVENTS => HookKey::All,
            event_type => HookKey::Type(event_type),
        }
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKey::All => write!(f, "{}", ALL_EVENTS),
            HookKey::Type(event_type) => write!(f, "{}", event_type),
        }
    }
}

/// One or more routes, as accepted by hook registration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventTypes(Vec<HookKey>);

impl EventTypes {
    pub fn keys(&self) -> &[HookKey] {
        &self.0
    }
}

impl From<&str> for EventTypes {
    fn from(name: &str) -> Self {
        EventTypes(vec![name.into()])
    }
}

impl From<String> for EventTypes {
    fn from(name: String) -> Self {
        EventTypes(vec![name.into()])
    }
}

impl From<EventType> for EventTypes {
    fn from(event_type: EventType) -> Self {
        EventTypes(vec![event_type.into()])
    }
}

impl From<HookKey> for EventTypes {
    fn from(key: HookKey) -> Self {
        EventTypes(vec![key])
    }
}

impl<T: Into<HookKey>, const N: usize> From<[T; N]> for EventTypes {
    fn from(keys: [T; N]) -> Self {
        EventTypes(keys.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<HookKey>> From<Vec<T>> for EventTypes {
    fn from(keys: Vec<T>) -> Self {
        EventTypes(keys.into_iter().map(Into::into).collect())
    }
}

/// Identifier of a registered hook, unique within its module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub u32);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook#{}", self.0)
    }
}

type Callback<M> = Box<dyn FnMut(&mut M, &Event) -> Result<(), BoxError>>;

struct Hook<M> {
    id: HookId,
    routes: Vec<HookKey>,
    filter: Filter,
    callback: Callback<M>,
}

/// A hook callback that failed.
#[derive(Debug)]
pub struct HookFailure {
    pub hook: HookId,
    pub source: BoxError,
}

/// Hook table of one module.
pub struct HookRegistry<M> {
    hooks: Vec<Hook<M>>,
    routes: HashMap<HookKey, Vec<usize>>,
}

impl<M> HookRegistry<M> {
    pub fn new() -> Self {
        Self {
            hooks: Vec::new(),
            routes: HashMap::new(),
        }
    }

    /// Stores a hook under every given route. The filter must already be
    /// expanded.
    pub fn insert<F, R>(&mut self, event_types: EventTypes, filter: Filter, mut callback: F) -> HookId
    where
        F: FnMut(&mut M, &Event) -> R + 'static,
        R: HookResult,
    {
        let index = self.hooks.len();
        let id = HookId(index as u32);

        let mut routes: Vec<HookKey> = Vec::new();
        for key in event_types.0 {
            if !routes.contains(&key) {
                routes.push(key);
            }
        }
        for key in &routes {
            self.routes.entry(key.clone()).or_default().push(index);
        }

        self.hooks.push(Hook {
            id,
            routes,
            filter,
            callback: Box::new(move |module, event| callback(module, event).into_hook_result()),
        });
        id
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Routes a hook was registered under.
    pub fn routes(&self, id: HookId) -> Option<&[HookKey]> {
        self.hooks.get(id.0 as usize).map(|hook| hook.routes.as_slice())
    }

    /// Filter stored for a hook.
    pub fn filter(&self, id: HookId) -> Option<&Filter> {
        self.hooks.get(id.0 as usize).map(|hook| &hook.filter)
    }

    /// Hooks that could receive an event of this type, in dispatch order.
    pub fn candidates(&self, event_type: &EventType) -> Vec<HookId> {
        let mut indices: Vec<usize> = Vec::new();

        if !event_type.is_internal() {
            if let Some(all) = self.routes.get(&HookKey::All) {
                indices.extend(all);
            }
        }
        if let Some(typed) = self.routes.get(&HookKey::Type(event_type.clone())) {
            for index in typed {
                if !indices.contains(index) {
                    indices.push(*index);
                }
            }
        }

        indices.into_iter().map(|index| self.hooks[index].id).collect()
    }

    /// Runs every matching hook against the event.
    ///
    /// Returns the number of callbacks invoked. Stops at the first failing
    /// callback.
    pub fn dispatch(&mut self, module: &mut M, event: &Event) -> Result<usize, HookFailure> {
        let mut fired = 0;
        for id in self.candidates(&event.event_type) {
            let hook = &mut self.hooks[id.0 as usize];
            if !hook.filter.matches(event) {
                continue;
            }
            (hook.callback)(module, event).map_err(|source| HookFailure { hook: id, source })?;
            fired += 1;
        }
        Ok(fired)
    }
}

impl<M> Default for HookRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for HookRegistry<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    fn record(label: &'static str) -> impl FnMut(&mut Recorder, &Event) {
        move |recorder: &mut Recorder, _event: &Event| recorder.calls.push(label)
    }

    #[test]
    fn test_hook_key_from_str() {
        assert_eq!(HookKey::from("all"), HookKey::All);
        assert_eq!(HookKey::from("damage"), HookKey::Type(EventType::named("damage")));
    }

    #[test]
    fn test_named_all_event_type_routes_everything() {
        assert_eq!(HookKey::from(EventType::named("all")), HookKey::All);
        assert_eq!(
            HookKey::from(EventType::internal("all")),
            HookKey::Type(EventType::internal("all"))
        );

        let mut registry = HookRegistry::new();
        registry.insert(EventType::named("all").into(), Filter::new(), record("named-all"));
        registry.insert("all".into(), Filter::new(), record("all"));

        let mut recorder = Recorder::default();
        let fired = registry.dispatch(&mut recorder, &Event::new("damage")).unwrap();

        assert_eq!(fired, 2);
        assert_eq!(recorder.calls, vec!["named-all", "all"]);
    }

    #[test]
    fn test_event_types_conversions() {
        assert_eq!(EventTypes::from("cast").keys().len(), 1);
        assert_eq!(EventTypes::from(["cast", "damage"]).keys().len(), 2);
        assert_eq!(
            EventTypes::from(vec![EventType::internal("marker")]).keys(),
            &[HookKey::Type(EventType::internal("marker"))]
        );
    }

    #[test]
    fn test_all_hooks_run_before_typed_hooks() {
        let mut registry = HookRegistry::new();
        registry.insert("damage".into(), Filter::new(), record("typed-1"));
        registry.insert("all".into(), Filter::new(), record("all"));
        registry.insert("damage".into(), Filter::new(), record("typed-2"));

        let mut recorder = Recorder::default();
        let fired = registry.dispatch(&mut recorder, &Event::new("damage")).unwrap();

        assert_eq!(fired, 3);
        assert_eq!(recorder.calls, vec!["all", "typed-1", "typed-2"]);
    }

    #[test]
    fn test_all_hooks_skip_internal_events() {
        let mut registry = HookRegistry::new();
        registry.insert("all".into(), Filter::new(), record("all"));
        registry.insert(EventType::internal("start").into(), Filter::new(), record("start"));

        let mut recorder = Recorder::default();
        registry.dispatch(&mut recorder, &Event::internal("start")).unwrap();

        assert_eq!(recorder.calls, vec!["start"]);
    }

    #[test]
    fn test_internal_type_does_not_match_named_type() {
        let mut registry = HookRegistry::new();
        registry.insert("start".into(), Filter::new(), record("named"));

        let mut recorder = Recorder::default();
        let fired = registry.dispatch(&mut recorder, &Event::internal("start")).unwrap();

        assert_eq!(fired, 0);
    }

    #[test]
    fn test_hook_fires_once_per_event() {
        let mut registry = HookRegistry::new();
        registry.insert(["all", "damage", "damage"].into(), Filter::new(), record("once"));

        let mut recorder = Recorder::default();
        registry.dispatch(&mut recorder, &Event::new("damage")).unwrap();

        assert_eq!(recorder.calls, vec!["once"]);
        assert_eq!(registry.routes(HookId(0)).unwrap().len(), 2);
    }

    #[test]
    fn test_filter_gates_callback() {
        let mut registry = HookRegistry::new();
        registry.insert("damage".into(), Filter::new().field("sourceID", 1), record("player"));

        let mut recorder = Recorder::default();
        registry.dispatch(&mut recorder, &Event::new("damage").with_source(2)).unwrap();
        registry.dispatch(&mut recorder, &Event::new("damage").with_source(1)).unwrap();

        assert_eq!(recorder.calls, vec!["player"]);
    }

    #[test]
    fn test_identical_registrations_are_distinct_hooks() {
        let mut registry = HookRegistry::new();
        let first = registry.insert("cast".into(), Filter::new(), record("a"));
        let second = registry.insert("cast".into(), Filter::new(), record("a"));

        let mut recorder = Recorder::default();
        registry.dispatch(&mut recorder, &Event::new("cast")).unwrap();

        assert_ne!(first, second);
        assert_eq!(recorder.calls.len(), 2);
    }

    #[test]
    fn test_failing_callback_stops_dispatch() {
        let mut registry: HookRegistry<Recorder> = HookRegistry::new();
        registry.insert("cast".into(), Filter::new(), |_: &mut Recorder, _: &Event| {
            Err::<(), _>("bad cast")
        });
        registry.insert("cast".into(), Filter::new(), record("after"));

        let mut recorder = Recorder::default();
        let failure = registry.dispatch(&mut recorder, &Event::new("cast")).unwrap_err();

        assert_eq!(failure.hook, HookId(0));
        assert_eq!(failure.source.to_string(), "bad cast");
        assert!(recorder.calls.is_empty());
    }

    #[test]
    fn test_unrouted_event_fires_nothing() {
        let mut registry = HookRegistry::new();
        registry.insert("cast".into(), Filter::new(), record("cast"));

        let mut recorder = Recorder::default();
        assert_eq!(registry.dispatch(&mut recorder, &Event::new("heal")).unwrap(), 0);
    }
}
