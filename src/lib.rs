//! Plugin execution runtime.
//!
//! Computational code is packaged as [`Module`]s. A module declares which
//! [`PropertyType`]s it can be run as, the inputs it is configured with and the
//! submodule roles it delegates to. Modules are wired together at runtime,
//! locked, and then run; results are memoized per module instance, keyed by a
//! fingerprint of the module's full transitive configuration.

pub mod batch;
pub mod cache;
pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod logging;
pub mod manager;
pub mod module;
pub mod property_type;
pub mod value;

#[cfg(test)]
mod testing;

pub use cache::{CacheStats, Fingerprint, MemoCache};
pub use config::{ConfigError, RuntimeConfig};
pub use display::format_tree;
pub use error::{ContractViolation, ModuleError, Result};
pub use graph::SubmoduleGraph;
pub use manager::ModuleManager;
pub use module::{
    Module, ModuleBuilder, ModuleId, ModuleInput, ModuleStatus, NotReadyReport, Requirement, RunContext,
    SubmoduleSlot,
};
pub use property_type::{FieldList, FieldSpec, PropertyType, PropertyTypeInfo, Side};
pub use value::{FromValue, IntoValue, Value, ValueBag, ValueKind, ValueTuple};
