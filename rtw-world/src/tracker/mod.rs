//! Pluggable analysis modules run over every fused snapshot
//!
//! Modules are owned by the [`ModuleRegistry`] and looked up by name. A module
//! that fails is logged and skipped; the rest still run.

pub mod possession;

pub use possession::BallPossession;

use rtw_common::messages::WorldSnapshot;
use thiserror::Error;
use tracing::warn;

/// Failure of a single module update
#[derive(Error, Debug)]
pub enum ModuleError {
    /// The snapshot lacks something the module needs
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Any other module-internal failure
    #[error("module failed: {0}")]
    Failed(String),
}

/// An analysis run once per fused snapshot
pub trait TrackerModule: Send {
    fn name(&self) -> &str;

    fn update(&mut self, world: &WorldSnapshot) -> Result<(), ModuleError>;

    /// Current output of the module, for inspection
    fn summary(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Ordered, owning collection of tracker modules
///
/// Registering the same instance twice is impossible: `add` takes ownership.
///
/// ```compile_fail
/// # use rtw_world::tracker::{BallPossession, ModuleRegistry};
/// let mut registry = ModuleRegistry::new();
/// let module = Box::new(BallPossession::new(0.15));
/// registry.add(module);
/// registry.add(module); // use of moved value
/// ```
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn TrackerModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, always `true`
    ///
    /// The registry owns its modules, so an instance already registered can
    /// never be passed in again. Distinct instances sharing a name are both
    /// kept.
    pub fn add(&mut self, module: Box<dyn TrackerModule>) -> bool {
        self.modules.push(module);
        true
    }

    pub fn has(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m.name() == name)
    }

    /// First module with this name
    pub fn get(&self, name: &str) -> Option<&dyn TrackerModule> {
        self.modules
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
    }

    /// Unregister the first module with this name, handing it back
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn TrackerModule>> {
        let index = self.modules.iter().position(|m| m.name() == name)?;
        Some(self.modules.remove(index))
    }

    /// Run every module in registration order, returning how many failed
    pub fn update(&mut self, world: &WorldSnapshot) -> usize {
        let mut failures = 0;
        for module in self.modules.iter_mut() {
            if let Err(e) = module.update(world) {
                warn!("Tracker module '{}' failed: {}", module.name(), e);
                failures += 1;
            }
        }
        failures
    }

    pub fn names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn TrackerModule> {
        self.modules.iter().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
