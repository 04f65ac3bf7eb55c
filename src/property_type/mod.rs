//! Property types: the typed contracts modules are run as.
//!
//! A property type fixes, for one computational concern (an area, an energy,
//! a volume...), the ordered input slots a caller provides and the ordered
//! result slots a module returns. It is also the wrap/unwrap boundary between
//! the generic [`ValueBag`] that flows through the runtime and the concrete
//! tuples module implementations are written against.
//!
//! Property types carry no state. They are declared as plain Rust types:
//!
//! ```ignore
//! struct Area;
//!
//! impl PropertyType for Area {
//!     type Inputs = (f64, f64);
//!     type Results = (f64,);
//!
//!     fn inputs() -> FieldList {
//!         FieldList::new().add::<f64>("base", "Length of the base").add::<f64>("height", "Height")
//!     }
//!
//!     fn results() -> FieldList {
//!         FieldList::new().add::<f64>("area", "The area")
//!     }
//! }
//! ```
pub mod checker;
pub mod fields;

pub use fields::{FieldList, FieldSpec, Side};

use crate::error::{ContractViolation, Result};
use crate::value::{ValueBag, ValueTuple};
use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

pub trait PropertyType: Send + Sync + 'static {
    /// Concrete shape of the input slots, in declaration order.
    type Inputs: ValueTuple;
    /// Concrete shape of the result slots, in declaration order.
    type Results: ValueTuple;

    fn inputs() -> FieldList;

    fn results() -> FieldList;

    fn name() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    fn info() -> PropertyTypeInfo {
        PropertyTypeInfo {
            type_id: TypeId::of::<Self>(),
            name: Self::name(),
            inputs: Self::inputs(),
            results: Self::results(),
        }
    }

    /// Generic input bag -> concrete input tuple.
    fn wrap_inputs(inputs: &ValueBag) -> Result<Self::Inputs> {
        let fields = Self::inputs();
        let conformed = checker::conform(Self::name(), Side::Inputs, &fields, inputs)?;
        Ok(checker::to_tuple(Self::name(), Side::Inputs, &fields, conformed)?)
    }

    /// Concrete input tuple -> generic input bag, in declaration order.
    fn unwrap_inputs(inputs: Self::Inputs) -> ValueBag {
        Self::inputs().names().zip(inputs.into_values()).collect()
    }

    /// Concrete result tuple -> generic result bag, in declaration order.
    fn wrap_results(results: Self::Results) -> ValueBag {
        Self::results().names().zip(results.into_values()).collect()
    }

    /// Generic result bag -> concrete result tuple.
    fn unwrap_results(results: &ValueBag) -> Result<Self::Results> {
        let fields = Self::results();
        let conformed = checker::conform(Self::name(), Side::Results, &fields, results)?;
        Ok(checker::to_tuple(Self::name(), Side::Results, &fields, conformed)?)
    }
}

/// Runtime descriptor of a property type: its identity tag plus its declared
/// slots. This is what the type-erased side of the runtime passes around.
#[derive(Debug, Clone)]
pub struct PropertyTypeInfo {
    type_id: TypeId,
    name: &'static str,
    inputs: FieldList,
    results: FieldList,
}

impl PropertyTypeInfo {
    pub fn of<P: PropertyType>() -> Self {
        P::info()
    }

    pub fn id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn inputs(&self) -> &FieldList {
        &self.inputs
    }

    pub fn results(&self) -> &FieldList {
        &self.results
    }

    pub fn is<P: PropertyType>(&self) -> bool {
        self.type_id == TypeId::of::<P>()
    }

    /// Canonical call-time input bag: declared order, defaults filled in.
    pub fn conform_inputs(&self, inputs: &ValueBag) -> std::result::Result<ValueBag, ContractViolation> {
        checker::conform(self.name, Side::Inputs, &self.inputs, inputs)
    }

    pub fn conform_results(&self, results: &ValueBag) -> std::result::Result<ValueBag, ContractViolation> {
        checker::conform(self.name, Side::Results, &self.results, results)
    }

    /// Verifies the declared slots against the tuple types of `P`.
    pub(crate) fn check_declaration<P: PropertyType>(&self) -> std::result::Result<(), ContractViolation> {
        checker::check_tuple::<P::Inputs>(self.name, Side::Inputs, &self.inputs)?;
        checker::check_tuple::<P::Results>(self.name, Side::Results, &self.results)
    }
}

impl PartialEq for PropertyTypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for PropertyTypeInfo {}

impl Hash for PropertyTypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl PartialOrd for PropertyTypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyTypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(other.name).then_with(|| self.type_id.cmp(&other.type_id))
    }
}

impl fmt::Display for PropertyTypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
