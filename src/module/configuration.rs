//! The configurable state of a module and its two-phase lifecycle.
//!
//! A module's inputs and submodule bindings live in a [`Configuration`]. While
//! the module is being set up the configuration is owned and mutable
//! ([`Stage::Configuring`]); locking freezes it into a shared, immutable
//! snapshot ([`Stage::Locked`]). Runs only ever read a snapshot, and an
//! unlocked copy starts a new configuring stage from one.
use super::Module;
use crate::cache::Fingerprint;
use crate::property_type::PropertyTypeInfo;
use crate::value::{Value, ValueKind};
use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

/// A module-level input: value, description, default and explicit-set flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInput {
    kind: ValueKind,
    description: String,
    default: Option<Value>,
    value: Option<Value>,
    required: bool,
}

impl ModuleInput {
    pub(crate) fn new(kind: ValueKind, description: &str, default: Option<Value>, required: bool) -> Self {
        Self { kind, description: description.to_string(), default, value: None, required }
    }

    /// The value the module will see: the explicit one, else the default.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref().or(self.default.as_ref())
    }

    pub fn is_explicitly_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Required inputs need an explicit value or a default.
    pub fn is_ready(&self) -> bool {
        !self.required || self.value().is_some()
    }

    pub(crate) fn set(&mut self, value: Value) {
        self.value = Some(value);
    }
}

/// A named callback point: the property type it is called as and the module
/// currently bound to it, if any.
#[derive(Debug, Clone)]
pub struct SubmoduleSlot {
    property_type: PropertyTypeInfo,
    description: String,
    bound: Option<Module>,
}

impl SubmoduleSlot {
    pub(crate) fn new(property_type: PropertyTypeInfo, description: &str) -> Self {
        Self { property_type, description: description.to_string(), bound: None }
    }

    pub fn property_type(&self) -> &PropertyTypeInfo {
        &self.property_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn bound(&self) -> Option<&Module> {
        self.bound.as_ref()
    }

    pub(crate) fn bind(&mut self, module: Module) {
        self.bound = Some(module);
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Configuration {
    pub inputs: BTreeMap<String, ModuleInput>,
    pub submods: BTreeMap<String, SubmoduleSlot>,
}

impl Configuration {
    pub fn bound_submodules(&self) -> impl Iterator<Item = (&str, &Module)> {
        self.submods
            .iter()
            .filter_map(|(role, slot)| slot.bound.as_ref().map(|m| (role.as_str(), m)))
    }
}

/// A frozen configuration. Its fingerprint is computed at most once.
#[derive(Debug)]
pub(crate) struct LockedConfiguration {
    pub config: Configuration,
    pub fingerprint: OnceLock<Fingerprint>,
}

impl LockedConfiguration {
    pub fn new(config: Configuration) -> Self {
        Self { config, fingerprint: OnceLock::new() }
    }
}

#[derive(Debug)]
pub(crate) enum Stage {
    Configuring(Configuration),
    Locked(Arc<LockedConfiguration>),
}

/// A read-only view of a module's configuration that holds no lock.
pub(crate) enum Snapshot {
    Live(Configuration),
    Frozen(Arc<LockedConfiguration>),
}

impl Snapshot {
    pub fn of(stage: &Stage) -> Self {
        match stage {
            Stage::Configuring(config) => Snapshot::Live(config.clone()),
            Stage::Locked(frozen) => Snapshot::Frozen(Arc::clone(frozen)),
        }
    }
}

impl Deref for Snapshot {
    type Target = Configuration;

    fn deref(&self) -> &Configuration {
        match self {
            Snapshot::Live(config) => config,
            Snapshot::Frozen(frozen) => &frozen.config,
        }
    }
}
