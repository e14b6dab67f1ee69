//! Module/event engine for encounter analysis.
//!
//! The engine runs a normalized event stream through a graph of analysis
//! modules. Each module declares its dependencies, registers hooks for the
//! events it cares about, and contributes an optional payload to the final
//! report.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ModuleDescriptor[]  ┌──────────┐  ordered Setup  ┌─────────┐
//! │   manifest   │ ───────────────────▶ │ resolver │ ──────────────▶ │ modules │
//! └──────────────┘                      └──────────┘                 └─────────┘
//!                                                                         ▲
//! ┌──────────────┐      Event[]         ┌──────────┐   hooks+filters      │
//! │  event log   │ ───────────────────▶ │ analysis │ ─────────────────────┘
//! └──────────────┘                      └──────────┘
//!                                            │ outputs
//!                                            ▼
//!                                        Report
//! ```
//!
//! # Modules
//!
//! - [`filter`]: Structural filters and the matcher
//! - [`hook_filter`]: Registration-time `by` / `to` / `abilityId` shorthands
//! - [`hooks`]: Per-module hook registry and dispatch order
//! - [`module`]: Module contract, declarations and construction context
//! - [`resolver`]: Dependency ordering and module construction
//! - [`analysis`]: Runs (normalise, dispatch, report)
//! - [`report`]: Output aggregation

pub mod analysis;
pub mod filter;
pub mod hook_filter;
pub mod hooks;
pub mod module;
pub mod report;
pub mod resolver;

pub use analysis::{analyse, Analysis, AnalysisError, DispatchError};
pub use filter::{matches, Filter, FilterError, Matcher, Scalar};
pub use hook_filter::{EntityRef, HookFilter};
pub use hooks::{BoxError, EventTypes, HookId, HookKey, HookRegistry, HookResult, ALL_EVENTS};
pub use module::{display_order, Declaration, DeclarationWarning, Declare, Dep, Module, ModuleInfo, Setup};
pub use report::{aggregate, Report, ReportEntry};
pub use resolver::{resolve_order, ConfigError, ModuleDescriptor};

// Re-export event types used throughout the public API
pub use encounter_events::{Event, EventType, Player};
