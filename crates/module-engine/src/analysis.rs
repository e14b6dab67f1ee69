//! Analysis runs: normalisation, dispatch and report aggregation.
//!
//! An [`Analysis`] owns every module instance of one run. Events are
//! dispatched strictly in order, one at a time; for each event every module
//! is triggered in dependency order, so a module always sees its
//! dependencies' state already updated for the current event.

use std::cell::RefCell;
use std::rc::Rc;

use encounter_events::{Event, EventType, Player};
use serde_json::Value;

use crate::hooks::{BoxError, HookFailure, HookId, HookRegistry};
use crate::module::{lookup, DeclarationWarning, Dep, Instances, Module, ModuleInfo};
use crate::report::{aggregate, Report};
use crate::resolver::{build_all, ConfigError, ModuleDescriptor};

/// Type-erased view of one module and its hooks.
pub(crate) trait ModuleSlot {
    fn info(&self) -> &ModuleInfo;
    fn normalise(&mut self, events: Vec<Event>) -> Vec<Event>;
    fn trigger_event(&mut self, event: &Event) -> Result<usize, HookFailure>;
    fn output(&self) -> Option<Value>;
    fn hook_count(&self) -> usize;
}

pub(crate) struct Slot<M> {
    info: ModuleInfo,
    instance: Rc<RefCell<M>>,
    hooks: HookRegistry<M>,
}

impl<M: Module> Slot<M> {
    pub(crate) fn new(info: ModuleInfo, instance: Rc<RefCell<M>>, hooks: HookRegistry<M>) -> Self {
        Self {
            info,
            instance,
            hooks,
        }
    }
}

impl<M: Module> ModuleSlot for Slot<M> {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn normalise(&mut self, events: Vec<Event>) -> Vec<Event> {
        self.instance.borrow_mut().normalise(events)
    }

    fn trigger_event(&mut self, event: &Event) -> Result<usize, HookFailure> {
        let mut module = self.instance.borrow_mut();
        self.hooks.dispatch(&mut module, event)
    }

    fn output(&self) -> Option<Value> {
        self.instance.borrow().output()
    }

    fn hook_count(&self) -> usize {
        self.hooks.len()
    }
}

/// Failures while dispatching events. Either one aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A hook callback returned an error
    #[error("module `{module}` {hook} failed on event #{index} ({event_type}): {source}")]
    Hook {
        module: String,
        hook: HookId,
        index: usize,
        event_type: EventType,
        #[source]
        source: BoxError,
    },
    /// An event's timestamp is earlier than the one before it
    #[error("event #{index} ({event_type}) at {timestamp} precedes the previous event at {previous}")]
    OutOfOrder {
        index: usize,
        event_type: EventType,
        timestamp: f64,
        previous: f64,
    },
}

/// Any failure of a complete run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Module instances of one analysis run.
pub struct Analysis {
    player: Player,
    modules: Vec<Box<dyn ModuleSlot>>,
    instances: Instances,
    warnings: Vec<DeclarationWarning>,
    strict_order: bool,
    dispatched: usize,
    last_timestamp: Option<f64>,
}

impl Analysis {
    /// Resolves the manifest and builds every module.
    ///
    /// Fails without dispatching anything if the manifest has duplicate
    /// handles, unknown dependencies or a cycle, or if a constructor fails.
    pub fn new(player: Player, descriptors: Vec<ModuleDescriptor>) -> Result<Self, ConfigError> {
        let resolved = build_all(descriptors, &player)?;
        Ok(Self {
            player,
            modules: resolved.slots,
            instances: resolved.instances,
            warnings: resolved.warnings,
            strict_order: false,
            dispatched: 0,
            last_timestamp: None,
        })
    }

    /// Makes a backwards timestamp a fatal error instead of a warning.
    pub fn with_strict_order(mut self, strict: bool) -> Self {
        self.strict_order = strict;
        self
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Identities of all modules, in dependency order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleInfo> {
        self.modules.iter().map(|slot| slot.info())
    }

    /// Handles of all modules, in dependency order.
    pub fn handles(&self) -> Vec<&str> {
        self.modules().map(|info| info.handle.as_str()).collect()
    }

    /// Read-only reference to a module instance.
    pub fn module<T: Module>(&self, handle: &str) -> Option<Dep<T>> {
        lookup(&self.instances, handle)
    }

    /// Declaration warnings collected while building the modules.
    pub fn warnings(&self) -> &[DeclarationWarning] {
        &self.warnings
    }

    /// Number of events dispatched so far.
    pub fn events_dispatched(&self) -> usize {
        self.dispatched
    }

    /// Passes the sequence through every module's normaliser, in
    /// dependency order.
    pub fn normalise(&mut self, events: Vec<Event>) -> Vec<Event> {
        self.modules
            .iter_mut()
            .fold(events, |events, slot| slot.normalise(events))
    }

    /// Dispatches one event to every module.
    pub fn dispatch(&mut self, event: &Event) -> Result<(), DispatchError> {
        let index = self.dispatched;
        self.check_order(index, event)?;

        for slot in &mut self.modules {
            slot.trigger_event(event).map_err(|failure| DispatchError::Hook {
                module: slot.info().handle.clone(),
                hook: failure.hook,
                index,
                event_type: event.event_type.clone(),
                source: failure.source,
            })?;
        }

        self.dispatched += 1;
        Ok(())
    }

    fn check_order(&mut self, index: usize, event: &Event) -> Result<(), DispatchError> {
        let Some(timestamp) = event.timestamp() else {
            return Ok(());
        };
        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                if self.strict_order {
                    return Err(DispatchError::OutOfOrder {
                        index,
                        event_type: event.event_type.clone(),
                        timestamp,
                        previous,
                    });
                }
                tracing::warn!(
                    "Event #{} ({}) at {} precedes the previous event at {}",
                    index,
                    event.event_type,
                    timestamp,
                    previous
                );
                return Ok(());
            }
        }
        self.last_timestamp = Some(timestamp);
        Ok(())
    }

    /// Collects the current outputs of all modules.
    pub fn report(&self) -> Report {
        let entries = aggregate(
            self.modules
                .iter()
                .map(|slot| (slot.info(), slot.output())),
        );
        Report {
            entries,
            warnings: self.warnings.clone(),
            events_dispatched: self.dispatched,
        }
    }

    /// Normalises and dispatches a full event sequence, then aggregates.
    ///
    /// Consumes the analysis: module instances belong to a single run.
    /// References obtained through [`Analysis::module`] stay readable.
    pub fn run(mut self, events: Vec<Event>) -> Result<Report, DispatchError> {
        tracing::info!(
            "Starting analysis of {} events with {} modules",
            events.len(),
            self.modules.len()
        );

        let events = self.normalise(events);
        for event in &events {
            self.dispatch(event)?;
        }

        let report = self.report();
        tracing::info!(
            "Analysis complete: {} events dispatched, {} report entries",
            report.events_dispatched,
            report.entries.len()
        );
        Ok(report)
    }
}

impl std::fmt::Debug for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analysis")
            .field("player", &self.player.id)
            .field("modules", &self.handles())
            .field("dispatched", &self.dispatched)
            .finish()
    }
}

/// Builds the modules and runs the events through them in one call.
pub fn analyse(
    player: Player,
    descriptors: Vec<ModuleDescriptor>,
    events: Vec<Event>,
) -> Result<Report, AnalysisError> {
    let analysis = Analysis::new(player, descriptors)?;
    Ok(analysis.run(events)?)
}
