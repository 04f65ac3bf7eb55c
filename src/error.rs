//! Error types for module configuration and execution.
use crate::module::NotReadyReport;
use crate::property_type::Side;
use crate::value::ValueKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModuleError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModuleError {
    /// Mutation attempted on a locked module.
    #[error("Module '{module}' is locked and can not be modified")]
    State { module: String },

    #[error("Module '{module}' is not ready to run as {property_type}:\n{report}")]
    NotReady { module: String, property_type: String, report: NotReadyReport },

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Module '{module}' satisfies several property types ({}); specify one", .candidates.join(", "))]
    AmbiguousPropertyType { module: String, candidates: Vec<String> },

    #[error("Cyclic submodule dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// Raised by a module implementation itself.
    #[error("Module '{module}' failed: {message}")]
    Execution { module: String, message: String },

    #[error("No module registered under key '{key}'")]
    UnknownModule { key: String },

    #[error("Module key '{key}' is already in use")]
    DuplicateModule { key: String },
}

/// The precise way a caller broke a property-type or module contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("{side} of {property_type}: expected {expected} slot(s), got {actual}")]
    ArityMismatch { property_type: String, side: Side, expected: usize, actual: usize },

    #[error("{side} of {property_type}: missing value for slot '{slot}' which has no default")]
    MissingSlot { property_type: String, side: Side, slot: String },

    #[error("{side} of {property_type}: unexpected slot '{slot}'")]
    UnexpectedSlot { property_type: String, side: Side, slot: String },

    #[error("{side} of {property_type}: slot '{slot}' expects {expected}, got {actual}")]
    KindMismatch { property_type: String, side: Side, slot: String, expected: ValueKind, actual: ValueKind },

    #[error("{side} of {property_type}: slot '{slot}' is declared more than once")]
    DuplicateSlot { property_type: String, side: Side, slot: String },

    #[error("Module '{module}' does not satisfy property type {property_type}")]
    UnsupportedPropertyType { module: String, property_type: String },

    #[error("Module '{module}' declares no property types")]
    NoPropertyTypes { module: String },

    #[error("Module '{module}' has no input '{input}'")]
    UnknownInput { module: String, input: String },

    #[error("Input '{input}' of module '{module}' expects {expected}, got {actual}")]
    InputKindMismatch { module: String, input: String, expected: ValueKind, actual: ValueKind },

    #[error("Input '{input}' of module '{module}' has no value")]
    UnsetInput { module: String, input: String },

    #[error("Module '{module}' has no submodule role '{role}'")]
    UnknownSubmodule { module: String, role: String },

    #[error("Submodule role '{role}' of module '{module}' is not bound")]
    UnboundSubmodule { module: String, role: String },

    #[error("Submodule role '{role}' of module '{module}' is {expected}, not {actual}")]
    RoleMismatch { module: String, role: String, expected: String, actual: String },
}

impl ModuleError {
    /// Whether the caller can fix the problem by binding inputs/submodules and retrying.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ModuleError::NotReady { .. })
    }
}
