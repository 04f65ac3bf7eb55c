//! Slot declarations for property types.
use crate::value::{FromValue, IntoValue, Value, ValueKind};
use smallvec::SmallVec;
use std::fmt;

/// Which half of a property type a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Inputs,
    Results,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Inputs => f.write_str("inputs"),
            Side::Results => f.write_str("results"),
        }
    }
}

/// One named, typed slot.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: ValueKind,
    pub description: String,
    /// Only meaningful for input slots.
    pub default: Option<Value>,
}

/// The ordered slot list of one side of a property type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldList {
    fields: SmallVec<[FieldSpec; 4]>,
}

impl FieldList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a slot whose kind is taken from `T`.
    pub fn add<T: FromValue>(mut self, name: &str, description: &str) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: T::KIND,
            description: description.to_string(),
            default: None,
        });
        self
    }

    /// Appends an input slot that falls back to `default` when the caller omits it.
    pub fn add_default<T: FromValue + IntoValue>(mut self, name: &str, description: &str, default: T) -> Self {
        self.fields.push(FieldSpec {
            name: name.to_string(),
            kind: T::KIND,
            description: description.to_string(),
            default: Some(default.into_value()),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn kinds(&self) -> Vec<ValueKind> {
        self.fields.iter().map(|f| f.kind).collect()
    }

    /// First name declared more than once, if any.
    pub(crate) fn duplicate_name(&self) -> Option<&str> {
        self.fields
            .iter()
            .enumerate()
            .find(|(i, f)| self.fields[..*i].iter().any(|prev| prev.name == f.name))
            .map(|(_, f)| f.name.as_str())
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a FieldSpec;
    type IntoIter = std::slice::Iter<'a, FieldSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
