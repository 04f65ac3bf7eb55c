//! Conformance of generic bags against declared slot lists.
//!
//! Everything crossing the type-erased boundary goes through [`conform`] first:
//! the result is a bag holding exactly the declared slots, in declaration
//! order, with input defaults filled in. Hashing and tuple conversion both
//! rely on that canonical shape.
use super::fields::{FieldList, Side};
use crate::error::ContractViolation;
use crate::value::{ElementMismatch, ValueBag, ValueTuple};

pub(crate) fn conform(
    property_type: &str,
    side: Side,
    fields: &FieldList,
    bag: &ValueBag,
) -> Result<ValueBag, ContractViolation> {
    if bag.len() > fields.len() {
        return Err(ContractViolation::ArityMismatch {
            property_type: property_type.to_string(),
            side,
            expected: fields.len(),
            actual: bag.len(),
        });
    }
    if let Some(unexpected) = bag.names().find(|name| fields.get(name).is_none()) {
        return Err(ContractViolation::UnexpectedSlot {
            property_type: property_type.to_string(),
            side,
            slot: unexpected.to_string(),
        });
    }

    let mut conformed = ValueBag::with_capacity(fields.len());
    for field in fields {
        let value = match (bag.get(&field.name), &field.default) {
            (Some(value), _) => value.clone(),
            // Results never fall back to defaults.
            (None, Some(default)) if side == Side::Inputs => default.clone(),
            (None, _) => {
                return Err(ContractViolation::MissingSlot {
                    property_type: property_type.to_string(),
                    side,
                    slot: field.name.clone(),
                })
            }
        };
        if !field.kind.accepts(value.kind()) {
            return Err(ContractViolation::KindMismatch {
                property_type: property_type.to_string(),
                side,
                slot: field.name.clone(),
                expected: field.kind,
                actual: value.kind(),
            });
        }
        conformed.insert(field.name.clone(), value);
    }
    Ok(conformed)
}

/// Converts an already conformed bag into the concrete tuple.
pub(crate) fn to_tuple<T: ValueTuple>(
    property_type: &str,
    side: Side,
    fields: &FieldList,
    conformed: ValueBag,
) -> Result<T, ContractViolation> {
    T::from_values(conformed.into_values()).map_err(|mismatch| match mismatch {
        ElementMismatch::Arity { expected, actual } => ContractViolation::ArityMismatch {
            property_type: property_type.to_string(),
            side,
            expected,
            actual,
        },
        ElementMismatch::Kind { index, expected, actual } => ContractViolation::KindMismatch {
            property_type: property_type.to_string(),
            side,
            slot: fields.iter().nth(index).map(|f| f.name.clone()).unwrap_or_default(),
            expected,
            actual,
        },
    })
}

/// Checks that a declared slot list and the tuple type standing for it agree
/// in arity and kinds.
pub(crate) fn check_tuple<T: ValueTuple>(
    property_type: &str,
    side: Side,
    fields: &FieldList,
) -> Result<(), ContractViolation> {
    if let Some(slot) = fields.duplicate_name() {
        return Err(ContractViolation::DuplicateSlot {
            property_type: property_type.to_string(),
            side,
            slot: slot.to_string(),
        });
    }
    if T::ARITY != fields.len() {
        return Err(ContractViolation::ArityMismatch {
            property_type: property_type.to_string(),
            side,
            expected: fields.len(),
            actual: T::ARITY,
        });
    }
    for (field, kind) in fields.iter().zip(T::kinds()) {
        if !kind.accepts(field.kind) {
            return Err(ContractViolation::KindMismatch {
                property_type: property_type.to_string(),
                side,
                slot: field.name.clone(),
                expected: field.kind,
                actual: kind,
            });
        }
    }
    Ok(())
}
