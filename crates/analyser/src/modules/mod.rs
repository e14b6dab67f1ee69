//! Built-in analysis modules.
//!
//! - [`encounter`]: Encounter bounds and boundary markers
//! - [`about`]: Player and encounter summary
//! - [`damage`]: Damage done per ability
//! - [`casts`]: Casts per ability
//! - [`suggestions`]: Suggestions based on the above
//! - [`counter`]: Counters declared in configuration

pub mod about;
pub mod casts;
pub mod counter;
pub mod damage;
pub mod encounter;
pub mod suggestions;

use module_engine::ModuleDescriptor;

use crate::config::{AnalyserConfig, SettingsError};

pub use about::About;
pub use casts::Casts;
pub use counter::Counter;
pub use damage::DamageDone;
pub use encounter::Encounter;
pub use suggestions::Suggestions;

/// Descriptors of every built-in module, in declaration order.
pub fn builtin_descriptors() -> Vec<ModuleDescriptor> {
    vec![
        ModuleDescriptor::of::<Encounter>(),
        ModuleDescriptor::of::<About>(),
        ModuleDescriptor::of::<DamageDone>(),
        ModuleDescriptor::of::<Casts>(),
        ModuleDescriptor::of::<Suggestions>(),
    ]
}

/// Descriptors for a configured run: enabled built-ins, then counters.
///
/// Disabling a module that others depend on surfaces as an unknown
/// dependency when the analysis is built.
pub fn descriptors(config: &AnalyserConfig) -> Result<Vec<ModuleDescriptor>, SettingsError> {
    let builtins = builtin_descriptors();
    for handle in &config.analysis.disabled_modules {
        let known = builtins
            .iter()
            .any(|descriptor| descriptor.declaration().handle() == Some(handle.as_str()));
        if !known {
            return Err(SettingsError::UnknownModule {
                handle: handle.clone(),
            });
        }
    }

    let mut descriptors: Vec<ModuleDescriptor> = builtins
        .into_iter()
        .filter(|descriptor| match descriptor.declaration().handle() {
            Some(handle) if !config.is_enabled(handle) => {
                tracing::info!("Module `{}` disabled by configuration", handle);
                false
            }
            _ => true,
        })
        .collect();

    for counter in &config.counters {
        descriptors.push(counter::descriptor(counter)?);
    }
    Ok(descriptors)
}
