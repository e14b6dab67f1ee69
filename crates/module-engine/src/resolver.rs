//! Dependency resolution and module construction.
//!
//! Modules are ordered with a depth-first topological sort that walks the
//! manifest in declaration order, so independent modules keep their
//! declared order. Each module is built only after all of its dependencies,
//! and receives them by handle through its [`Setup`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use encounter_events::Player;

use crate::analysis::{ModuleSlot, Slot};
use crate::hooks::BoxError;
use crate::module::{Declaration, DeclarationWarning, Declare, Instances, Module, ModuleInfo, Setup};

/// Fatal problems found while assembling the module graph.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two modules share a handle
    #[error("duplicate module handle `{0}`")]
    DuplicateHandle(String),
    /// A dependency names a handle that is not in the manifest
    #[error("module `{module}` depends on unknown module `{dependency}`")]
    UnknownDependency { module: String, dependency: String },
    /// The dependency graph has a cycle
    #[error("dependency cycle: {}", .chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
    /// A module asked for a dependency it did not declare
    #[error("module `{module}` requested `{dependency}` without declaring it as a dependency")]
    UndeclaredDependency { module: String, dependency: String },
    /// A module asked for a dependency as the wrong type
    #[error("module `{module}` requested `{dependency}` as `{expected}`, which is a different module type")]
    DependencyType {
        module: String,
        dependency: String,
        expected: &'static str,
    },
    /// A module constructor failed
    #[error("failed to build module `{module}`: {source}")]
    Build {
        module: String,
        #[source]
        source: BoxError,
    },
}

type Built = (Rc<dyn Any>, Box<dyn ModuleSlot>);
type Constructor = Box<dyn FnOnce(&ModuleInfo, &Player, &Instances) -> Result<Built, ConfigError>>;

/// Entry of a module manifest: declaration plus constructor.
pub struct ModuleDescriptor {
    declaration: Declaration,
    type_name: &'static str,
    constructor: Constructor,
}

impl ModuleDescriptor {
    /// Describes a module type with a static declaration.
    pub fn of<M: Declare>() -> Self {
        Self::new(M::declaration(), M::build)
    }

    /// Describes a module from an explicit declaration and constructor.
    pub fn new<M, F>(declaration: Declaration, build: F) -> Self
    where
        M: Module,
        F: FnOnce(&mut Setup<'_, M>) -> Result<M, BoxError> + 'static,
    {
        let constructor: Constructor = Box::new(
            move |info: &ModuleInfo, player: &Player, instances: &Instances| {
                let mut setup = Setup::new(info, player, instances);
                let module = build(&mut setup).map_err(|source| ConfigError::Build {
                    module: info.handle.clone(),
                    source,
                })?;
                let hooks = setup.into_hooks();
                let instance = Rc::new(RefCell::new(module));
                let slot = Slot::new(info.clone(), Rc::clone(&instance), hooks);
                Ok((instance as Rc<dyn Any>, Box::new(slot) as Box<dyn ModuleSlot>))
            },
        );

        Self {
            declaration,
            type_name: std::any::type_name::<M>(),
            constructor,
        }
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl std::fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDescriptor")
            .field("declaration", &self.declaration)
            .field("type_name", &self.type_name)
            .finish()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Orders modules so every dependency precedes its dependents.
///
/// Returns indices into `modules`. Fails on duplicate handles, unknown
/// dependencies and cycles; a cycle is reported as the chain of handles
/// that closes it (e.g. `a -> b -> a`).
pub fn resolve_order(modules: &[ModuleInfo]) -> Result<Vec<usize>, ConfigError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, module) in modules.iter().enumerate() {
        if index.insert(module.handle.as_str(), i).is_some() {
            return Err(ConfigError::DuplicateHandle(module.handle.clone()));
        }
    }

    for module in modules {
        for dependency in &module.dependencies {
            if !index.contains_key(dependency.as_str()) {
                return Err(ConfigError::UnknownDependency {
                    module: module.handle.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    let mut state = vec![Visit::Pending; modules.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(modules.len());
    for i in 0..modules.len() {
        visit(i, modules, &index, &mut state, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit(
    i: usize,
    modules: &[ModuleInfo],
    index: &HashMap<&str, usize>,
    state: &mut [Visit],
    path: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> Result<(), ConfigError> {
    match state[i] {
        Visit::Done => return Ok(()),
        Visit::InProgress => {
            let start = path.iter().position(|&p| p == i).unwrap_or(0);
            let chain = path[start..]
                .iter()
                .chain(std::iter::once(&i))
                .map(|&p| modules[p].handle.clone())
                .collect();
            return Err(ConfigError::DependencyCycle { chain });
        }
        Visit::Pending => {}
    }

    state[i] = Visit::InProgress;
    path.push(i);
    for dependency in &modules[i].dependencies {
        visit(index[dependency.as_str()], modules, index, state, path, order)?;
    }
    path.pop();
    state[i] = Visit::Done;
    order.push(i);
    Ok(())
}

/// Modules of a run, built in dependency order.
pub(crate) struct Resolved {
    pub slots: Vec<Box<dyn ModuleSlot>>,
    pub instances: Instances,
    pub warnings: Vec<DeclarationWarning>,
}

/// Resolves identities, orders the manifest and builds every module.
///
/// Nothing is built unless the whole graph is valid.
pub(crate) fn build_all(
    descriptors: Vec<ModuleDescriptor>,
    player: &Player,
) -> Result<Resolved, ConfigError> {
    let mut infos = Vec::with_capacity(descriptors.len());
    let mut warnings = Vec::new();
    for descriptor in &descriptors {
        let (info, module_warnings) = descriptor.declaration.resolve(descriptor.type_name);
        for warning in &module_warnings {
            tracing::warn!("{}", warning);
        }
        warnings.extend(module_warnings);
        infos.push(info);
    }

    let order = resolve_order(&infos)?;
    tracing::debug!(
        "Module order: {}",
        order
            .iter()
            .map(|&i| infos[i].handle.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut constructors: Vec<Option<Constructor>> = descriptors
        .into_iter()
        .map(|descriptor| Some(descriptor.constructor))
        .collect();

    let mut instances = Instances::new();
    let mut slots = Vec::with_capacity(order.len());
    for i in order {
        let info = &infos[i];
        let Some(constructor) = constructors[i].take() else {
            continue;
        };
        let (instance, slot) = constructor(info, player, &instances)?;
        tracing::debug!("Built module `{}` with {} hooks", info.handle, slot.hook_count());
        instances.insert(info.handle.clone(), instance);
        slots.push(slot);
    }

    Ok(Resolved {
        slots,
        instances,
        warnings,
    })
}
