//! Module contract, identity metadata and construction context.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use encounter_events::{Event, Player};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::hook_filter::HookFilter;
use crate::hooks::{BoxError, EventTypes, HookId, HookRegistry, HookResult};
use crate::filter::Filter;
use crate::resolver::ConfigError;

/// Named display-order bands. Lower values sort earlier in the report.
pub mod display_order {
    /// Encounter and player summary
    pub const ABOUT: i32 = -3;
    /// Checklist of rules
    pub const CHECKLIST: i32 = -2;
    /// Improvement suggestions
    pub const SUGGESTIONS: i32 = -1;
    /// First band for regular modules
    pub const TOP: i32 = 0;
    /// Regular modules
    pub const DEFAULT: i32 = 50;
    /// Last band
    pub const BOTTOM: i32 = 100;
}

/// Unit of analysis.
///
/// An instance lives for one analysis run. It observes events through the
/// hooks it registers while being built and reports through [`Module::output`].
pub trait Module: 'static {
    /// Reshapes the full event sequence before dispatch.
    fn normalise(&mut self, events: Vec<Event>) -> Vec<Event> {
        events
    }

    /// Contribution to the report, or `None` to be left out.
    fn output(&self) -> Option<Value> {
        None
    }
}

/// A module type with a static declaration and constructor.
pub trait Declare: Module + Sized {
    /// Identity and dependencies of the module.
    fn declaration() -> Declaration;

    /// Builds the module, registering its hooks on `setup`.
    fn build(setup: &mut Setup<'_, Self>) -> Result<Self, BoxError>;
}

/// Identity metadata as written by a module author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    handle: Option<String>,
    title: Option<String>,
    display_order: i32,
    dependencies: Vec<String>,
}

impl Declaration {
    /// Declares a module with an explicit handle.
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            ..Self::unnamed()
        }
    }

    /// Declares a module without a handle; one is derived from the type
    /// name and a warning is raised.
    pub fn unnamed() -> Self {
        Self {
            handle: None,
            title: None,
            display_order: display_order::DEFAULT,
            dependencies: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn display_order(mut self, display_order: i32) -> Self {
        self.display_order = display_order;
        self
    }

    /// Adds dependencies by handle.
    pub fn depends_on<I, S>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(handles.into_iter().map(Into::into));
        self
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    /// Fills in missing identity fields. `type_name` is used to derive a
    /// handle when none was declared.
    pub fn resolve(&self, type_name: &str) -> (ModuleInfo, Vec<DeclarationWarning>) {
        let mut warnings = Vec::new();

        let handle = match &self.handle {
            Some(handle) => handle.clone(),
            None => {
                let derived = derive_handle(type_name);
                warnings.push(DeclarationWarning::MissingHandle {
                    type_name: type_name.to_string(),
                    derived: derived.clone(),
                });
                derived
            }
        };

        let title = match &self.title {
            Some(title) => title.clone(),
            None => {
                let derived = capitalize(&handle);
                warnings.push(DeclarationWarning::MissingTitle {
                    handle: handle.clone(),
                    derived: derived.clone(),
                });
                derived
            }
        };

        let info = ModuleInfo {
            handle,
            title,
            display_order: self.display_order,
            dependencies: self.dependencies.clone(),
        };
        (info, warnings)
    }
}

/// Resolved identity of a module in a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub handle: String,
    pub title: String,
    pub display_order: i32,
    pub dependencies: Vec<String>,
}

/// Non-fatal problems with a module declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclarationWarning {
    /// No handle was declared
    MissingHandle { type_name: String, derived: String },
    /// No title was declared
    MissingTitle { handle: String, derived: String },
}

impl fmt::Display for DeclarationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationWarning::MissingHandle { type_name, derived } => write!(
                f,
                "`{}` does not declare a handle, using `{}`; derived handles are not stable across builds",
                type_name, derived
            ),
            DeclarationWarning::MissingTitle { handle, derived } => {
                write!(f, "`{}` does not declare a title, using `{}`", handle, derived)
            }
        }
    }
}

/// Last path segment of a type name, without generics, first letter lowercased.
fn derive_handle(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let name = base.rsplit("::").next().unwrap_or(base);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(handle: &str) -> String {
    let mut chars = handle.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read-only reference to another module's instance.
///
/// The reference is shared with the instance the dependency's own hooks
/// mutate, so reading it after dispatch sees the final state.
pub struct Dep<T> {
    handle: String,
    inner: Rc<RefCell<T>>,
}

impl<T> Dep<T> {
    pub(crate) fn new(handle: impl Into<String>, inner: Rc<RefCell<T>>) -> Self {
        Self {
            handle: handle.into(),
            inner,
        }
    }

    /// Handle of the referenced module.
    pub fn handle(&self) -> &str {
        &self.handle
    }

    /// Borrows the module's current state.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    /// Checks whether two references point at the same instance.
    pub fn ptr_eq(&self, other: &Dep<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Dep<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Dep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep").field("handle", &self.handle).finish()
    }
}

/// Type-erased instances built so far, keyed by handle.
pub(crate) type Instances = HashMap<String, Rc<dyn Any>>;

pub(crate) fn lookup<T: Module>(instances: &Instances, handle: &str) -> Option<Dep<T>> {
    let instance = instances.get(handle)?;
    Rc::clone(instance)
        .downcast::<RefCell<T>>()
        .ok()
        .map(|inner| Dep::new(handle, inner))
}

/// Construction context handed to a module's constructor.
///
/// Gives access to the analyzed player and to already-built dependencies,
/// and collects the hooks the module registers.
pub struct Setup<'a, M> {
    info: &'a ModuleInfo,
    player: &'a Player,
    instances: &'a Instances,
    hooks: HookRegistry<M>,
}

impl<'a, M: Module> Setup<'a, M> {
    pub(crate) fn new(info: &'a ModuleInfo, player: &'a Player, instances: &'a Instances) -> Self {
        Self {
            info,
            player,
            instances,
            hooks: HookRegistry::new(),
        }
    }

    /// Resolved identity of the module being built.
    pub fn info(&self) -> &ModuleInfo {
        self.info
    }

    pub fn handle(&self) -> &str {
        &self.info.handle
    }

    /// The analyzed player.
    pub fn player(&self) -> &Player {
        self.player
    }

    /// Returns a declared dependency by handle.
    pub fn dependency<T: Module>(&self, handle: &str) -> Result<Dep<T>, ConfigError> {
        if !self.info.dependencies.iter().any(|dep| dep == handle) {
            return Err(ConfigError::UndeclaredDependency {
                module: self.info.handle.clone(),
                dependency: handle.to_string(),
            });
        }
        if !self.instances.contains_key(handle) {
            return Err(ConfigError::UnknownDependency {
                module: self.info.handle.clone(),
                dependency: handle.to_string(),
            });
        }
        lookup(self.instances, handle).ok_or_else(|| ConfigError::DependencyType {
            module: self.info.handle.clone(),
            dependency: handle.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Registers an unfiltered hook.
    pub fn add_hook<F, R>(&mut self, event_types: impl Into<EventTypes>, callback: F) -> HookId
    where
        F: FnMut(&mut M, &Event) -> R + 'static,
        R: HookResult,
    {
        self.hooks.insert(event_types.into(), Filter::new(), callback)
    }

    /// Registers a hook gated by a filter. Shorthand keys are expanded
    /// against the player before the hook is stored.
    pub fn add_hook_filtered<F, R>(
        &mut self,
        event_types: impl Into<EventTypes>,
        filter: impl Into<HookFilter>,
        callback: F,
    ) -> HookId
    where
        F: FnMut(&mut M, &Event) -> R + 'static,
        R: HookResult,
    {
        let filter = filter.into().expand(self.player);
        self.hooks.insert(event_types.into(), filter, callback)
    }

    /// Hooks registered so far.
    pub fn hooks(&self) -> &HookRegistry<M> {
        &self.hooks
    }

    pub(crate) fn into_hooks(self) -> HookRegistry<M> {
        self.hooks
    }
}
