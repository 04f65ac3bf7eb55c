//! What a module implementation sees while it runs.
use super::configuration::Configuration;
use super::Module;
use crate::error::{ContractViolation, ModuleError, Result};
use crate::property_type::{PropertyType, PropertyTypeInfo};
use crate::value::{FromValue, Value, ValueBag};

/// Read access to the running module's frozen inputs and submodules.
pub struct RunContext<'a> {
    module: &'a Module,
    config: &'a Configuration,
}

impl<'a> RunContext<'a> {
    pub(crate) fn new(module: &'a Module, config: &'a Configuration) -> Self {
        Self { module, config }
    }

    pub fn module_name(&self) -> &str {
        self.module.name()
    }

    /// Effective value of a module input, converted to `T`.
    pub fn input<T: FromValue>(&self, name: &str) -> Result<T> {
        self.optional_input(name)?.ok_or_else(|| {
            ContractViolation::UnsetInput { module: self.module_name().to_string(), input: name.to_string() }.into()
        })
    }

    /// Like [`RunContext::input`], for inputs declared optional.
    pub fn optional_input<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        let input = self.config.inputs.get(name).ok_or_else(|| ContractViolation::UnknownInput {
            module: self.module_name().to_string(),
            input: name.to_string(),
        })?;
        let Some(value) = input.value() else {
            return Ok(None);
        };
        T::from_value(value.clone()).map(Some).map_err(|v| {
            ContractViolation::InputKindMismatch {
                module: self.module_name().to_string(),
                input: name.to_string(),
                expected: T::KIND,
                actual: v.kind(),
            }
            .into()
        })
    }

    pub fn input_value(&self, name: &str) -> Option<&Value> {
        self.config.inputs.get(name).and_then(|i| i.value())
    }

    /// The module bound to `role`.
    pub fn submodule(&self, role: &str) -> Result<&Module> {
        let slot = self.config.submods.get(role).ok_or_else(|| ContractViolation::UnknownSubmodule {
            module: self.module_name().to_string(),
            role: role.to_string(),
        })?;
        slot.bound().ok_or_else(|| {
            ContractViolation::UnboundSubmodule { module: self.module_name().to_string(), role: role.to_string() }
                .into()
        })
    }

    /// Runs the submodule bound to `role` as `P`. `P` must be the property
    /// type the role was declared with.
    pub fn run_as<P: PropertyType>(&self, role: &str, inputs: P::Inputs) -> Result<P::Results> {
        let info = P::info();
        self.check_role(role, &info)?;
        self.submodule(role)?.run_as::<P>(inputs)
    }

    /// Type-erased form of [`RunContext::run_as`], for forwarding bags onward.
    pub fn run_bag_as(&self, role: &str, property_type: &PropertyTypeInfo, inputs: &ValueBag) -> Result<ValueBag> {
        self.check_role(role, property_type)?;
        self.submodule(role)?.run_as_bag(property_type, inputs)
    }

    /// An execution error attributed to the running module.
    pub fn fail(&self, message: impl Into<String>) -> ModuleError {
        ModuleError::Execution { module: self.module_name().to_string(), message: message.into() }
    }

    fn check_role(&self, role: &str, property_type: &PropertyTypeInfo) -> Result<()> {
        match self.config.submods.get(role) {
            Some(slot) if slot.property_type() != property_type => Err(ContractViolation::RoleMismatch {
                module: self.module_name().to_string(),
                role: role.to_string(),
                expected: slot.property_type().name().to_string(),
                actual: property_type.name().to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}
