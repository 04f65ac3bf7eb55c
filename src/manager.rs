//! A keyed registry of module instances.
use crate::config::RuntimeConfig;
use crate::error::{ModuleError, Result};
use crate::module::Module;
use crate::property_type::{PropertyType, PropertyTypeInfo};
use crate::value::{IntoValue, ValueBag};
use std::collections::BTreeMap;
use tracing::debug;

/// Owns module handles under unique string keys and forwards configuration
/// calls to them by key.
#[derive(Debug, Default)]
pub struct ModuleManager {
    modules: BTreeMap<String, Module>,
    config: RuntimeConfig,
}

impl ModuleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self { modules: BTreeMap::new(), config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registers `module` under `key`. Its memoization flag is set from the
    /// manager's config.
    pub fn add_module(&mut self, key: &str, module: Module) -> Result<()> {
        if self.modules.contains_key(key) {
            return Err(ModuleError::DuplicateModule { key: key.to_string() });
        }
        if self.config.memoization {
            module.turn_on_memoization();
        } else {
            module.turn_off_memoization();
        }
        debug!(key, module = %module.name(), "module added");
        self.modules.insert(key.to_string(), module);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Result<&Module> {
        self.modules
            .get(key)
            .ok_or_else(|| ModuleError::UnknownModule { key: key.to_string() })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Stores an unlocked copy of the module at `old_key` under `new_key`.
    pub fn copy_module(&mut self, old_key: &str, new_key: &str) -> Result<()> {
        let copy = self.get(old_key)?.unlocked_copy();
        self.add_module(new_key, copy)
    }

    /// Removes `key` from the registry. Modules it is bound into keep their handle.
    pub fn erase(&mut self, key: &str) -> Option<Module> {
        self.modules.remove(key)
    }

    /// Moves the module at `old_key` to `new_key`. The instance is unchanged.
    pub fn rename_module(&mut self, old_key: &str, new_key: &str) -> Result<()> {
        if self.modules.contains_key(new_key) {
            return Err(ModuleError::DuplicateModule { key: new_key.to_string() });
        }
        let module = self
            .modules
            .remove(old_key)
            .ok_or_else(|| ModuleError::UnknownModule { key: old_key.to_string() })?;
        self.modules.insert(new_key.to_string(), module);
        Ok(())
    }

    pub fn change_input(&self, key: &str, input: &str, value: impl IntoValue) -> Result<()> {
        self.get(key)?.change_input(input, value)
    }

    /// Binds the module at `submod_key` to `role` of the module at `mod_key`.
    pub fn change_submod(&self, mod_key: &str, role: &str, submod_key: &str) -> Result<()> {
        let submodule = self.get(submod_key)?;
        self.get(mod_key)?.change_submod(role, submodule)
    }

    pub fn run_as<P: PropertyType>(&self, key: &str, inputs: P::Inputs) -> Result<P::Results> {
        self.get(key)?.run_as::<P>(inputs)
    }

    pub fn run_as_bag(&self, key: &str, property_type: &PropertyTypeInfo, inputs: &ValueBag) -> Result<ValueBag> {
        self.get(key)?.run_as_bag(property_type, inputs)
    }

    /// Batch run honoring the configured `parallel_batches` setting.
    pub fn run_batch_as<P: PropertyType>(&self, key: &str, batch: Vec<P::Inputs>) -> Result<Vec<Result<P::Results>>> {
        self.get(key)?.run_batch_as::<P>(batch, self.config.parallel_batches)
    }

    /// Applies every input override from the config. Stops at the first
    /// unknown key or rejected value.
    pub fn apply_config(&self) -> Result<()> {
        for (key, inputs) in &self.config.inputs {
            let module = self.get(key)?;
            for (name, value) in inputs {
                module.change_input(name, value.clone())?;
            }
        }
        Ok(())
    }
}
