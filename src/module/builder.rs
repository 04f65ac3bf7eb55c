//! Declaring module implementations.
use super::configuration::{Configuration, ModuleInput, SubmoduleSlot};
use super::context::RunContext;
use super::Module;
use crate::error::{ContractViolation, ModuleError, Result};
use crate::property_type::{PropertyType, PropertyTypeInfo};
use crate::value::{FromValue, IntoValue, ValueBag};
use std::fmt;
use std::sync::Arc;

type HandlerFn = dyn Fn(&ValueBag, &RunContext<'_>) -> Result<ValueBag> + Send + Sync;

/// The type-erased entry point for one property type: wraps the generic
/// inputs, calls the concrete implementation, wraps its results.
#[derive(Clone)]
pub(crate) struct Handler {
    pub info: PropertyTypeInfo,
    pub call: Arc<HandlerFn>,
}

/// What a module *is*, as opposed to how it is configured. Shared between a
/// module and all of its unlocked copies.
pub(crate) struct Implementation {
    pub name: String,
    pub description: Option<String>,
    pub citations: Vec<String>,
    /// Sorted by property type name.
    pub handlers: Vec<Handler>,
}

impl Implementation {
    pub fn handler(&self, property_type: &PropertyTypeInfo) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.info == *property_type)
    }

    pub fn satisfies(&self, property_type: &PropertyTypeInfo) -> bool {
        self.handler(property_type).is_some()
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property_types: Vec<&str> = self.handlers.iter().map(|h| h.info.name()).collect();
        f.debug_struct("Implementation")
            .field("name", &self.name)
            .field("property_types", &property_types)
            .finish()
    }
}

/// Builds a [`Module`] from typed handlers, inputs and submodule roles.
///
/// ```ignore
/// let prism = ModuleBuilder::new("PrismVolumeBySubmod")
///     .description("Computes the volume of a prism")
///     .submodule::<Area>("area", "Area of the base")
///     .satisfies::<PrismVolume, _>(|(base, height, width), ctx| {
///         let (area,) = ctx.run_as::<Area>("area", (base, height))?;
///         Ok((area * width,))
///     })
///     .build()?;
/// ```
pub struct ModuleBuilder {
    name: String,
    description: Option<String>,
    citations: Vec<String>,
    handlers: Vec<Handler>,
    config: Configuration,
    bindings: Vec<(String, Module)>,
    memoize: bool,
    error: Option<ModuleError>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            citations: Vec::new(),
            handlers: Vec::new(),
            config: Configuration::default(),
            bindings: Vec::new(),
            memoize: true,
            error: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn citation(mut self, citation: impl Into<String>) -> Self {
        self.citations.push(citation.into());
        self
    }

    /// Registers the implementation of property type `P`.
    pub fn satisfies<P, F>(mut self, f: F) -> Self
    where
        P: PropertyType,
        F: Fn(P::Inputs, &RunContext<'_>) -> Result<P::Results> + Send + Sync + 'static,
    {
        let info = P::info();
        if let Err(violation) = info.check_declaration::<P>() {
            self.record(violation.into());
            return self;
        }
        let call: Arc<HandlerFn> = Arc::new(move |inputs: &ValueBag, ctx: &RunContext<'_>| -> Result<ValueBag> {
            let concrete = P::wrap_inputs(inputs)?;
            let results = f(concrete, ctx)?;
            Ok(P::wrap_results(results))
        });
        self.handlers.retain(|h| h.info != info);
        self.handlers.push(Handler { info, call });
        self.handlers.sort_by(|a, b| a.info.cmp(&b.info));
        self
    }

    /// A required input with no default; the module is not ready until it is set.
    pub fn input<T: FromValue>(mut self, name: &str, description: &str) -> Self {
        self.config
            .inputs
            .insert(name.to_string(), ModuleInput::new(T::KIND, description, None, true));
        self
    }

    pub fn input_default<T: FromValue + IntoValue>(mut self, name: &str, description: &str, default: T) -> Self {
        let input = ModuleInput::new(T::KIND, description, Some(default.into_value()), true);
        self.config.inputs.insert(name.to_string(), input);
        self
    }

    /// An input the implementation can run without.
    pub fn optional_input<T: FromValue>(mut self, name: &str, description: &str) -> Self {
        self.config
            .inputs
            .insert(name.to_string(), ModuleInput::new(T::KIND, description, None, false));
        self
    }

    /// Declares a callback point `role` that must be bound to a module
    /// satisfying `P` before this module is ready.
    pub fn submodule<P: PropertyType>(mut self, role: &str, description: &str) -> Self {
        self.config
            .submods
            .insert(role.to_string(), SubmoduleSlot::new(P::info(), description));
        self
    }

    /// Binds `module` to `role` once the module is built.
    pub fn bind(mut self, role: &str, module: &Module) -> Self {
        self.bindings.push((role.to_string(), module.clone()));
        self
    }

    pub fn memoization(mut self, enabled: bool) -> Self {
        self.memoize = enabled;
        self
    }

    pub fn build(self) -> Result<Module> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.handlers.is_empty() {
            return Err(ContractViolation::NoPropertyTypes { module: self.name }.into());
        }
        let implementation = Implementation {
            name: self.name,
            description: self.description,
            citations: self.citations,
            handlers: self.handlers,
        };
        let module = Module::from_parts(Arc::new(implementation), self.config, self.memoize);
        for (role, submodule) in &self.bindings {
            module.change_submod(role, submodule)?;
        }
        Ok(module)
    }

    fn record(&mut self, err: ModuleError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
