//! Checked conversions between [`Value`] and concrete Rust types.
//!
//! No coercion happens here: an `Int` is never silently read as a `Float`.
use super::{Value, ValueKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A concrete type that can be read back out of a [`Value`].
pub trait FromValue: Sized {
    /// The kind a slot holding this type is declared with.
    const KIND: ValueKind;

    /// Returns the original value when its kind does not match.
    fn from_value(value: Value) -> Result<Self, Value>;
}

pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! impl_scalar {
    ($ty:ty, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;
            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }
    };
}

impl_scalar!(bool, Bool);
impl_scalar!(i64, Int);
impl_scalar!(f64, Float);
impl_scalar!(String, Str);
impl_scalar!(Arc<Vec<f64>>, Series);
impl_scalar!(Vec<Value>, List);
impl_scalar!(BTreeMap<String, Value>, Map);

impl FromValue for Vec<f64> {
    const KIND: ValueKind = ValueKind::Series;
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            // Unwraps without copying when the result is not shared.
            Value::Series(v) => Ok(Arc::try_unwrap(v).unwrap_or_else(|shared| shared.to_vec())),
            other => Err(other),
        }
    }
}

impl IntoValue for Vec<f64> {
    fn into_value(self) -> Value {
        Value::Series(Arc::new(self))
    }
}

impl FromValue for Value {
    const KIND: ValueKind = ValueKind::Any;
    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

/// Why an ordered list of values could not be turned into a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementMismatch {
    Arity { expected: usize, actual: usize },
    Kind { index: usize, expected: ValueKind, actual: ValueKind },
}

/// A fixed-arity tuple of concrete types: the shape a property type's inputs or
/// results take on the implementation side of the boundary.
pub trait ValueTuple: Sized + Send + 'static {
    const ARITY: usize;

    /// Kinds of the tuple elements, in order.
    fn kinds() -> Vec<ValueKind>;

    fn from_values(values: Vec<Value>) -> Result<Self, ElementMismatch>;

    fn into_values(self) -> Vec<Value>;
}

impl ValueTuple for () {
    const ARITY: usize = 0;

    fn kinds() -> Vec<ValueKind> {
        Vec::new()
    }

    fn from_values(values: Vec<Value>) -> Result<Self, ElementMismatch> {
        if values.is_empty() {
            Ok(())
        } else {
            Err(ElementMismatch::Arity { expected: 0, actual: values.len() })
        }
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

macro_rules! impl_value_tuple {
    ($arity:expr; $($T:ident),+) => {
        impl<$($T),+> ValueTuple for ($($T,)+)
        where
            $($T: FromValue + IntoValue + Send + 'static),+
        {
            const ARITY: usize = $arity;

            fn kinds() -> Vec<ValueKind> {
                vec![$($T::KIND),+]
            }

            #[allow(non_snake_case)]
            fn from_values(values: Vec<Value>) -> Result<Self, ElementMismatch> {
                if values.len() != $arity {
                    return Err(ElementMismatch::Arity { expected: $arity, actual: values.len() });
                }
                let mut iter = values.into_iter().enumerate();
                $(
                    let $T = match iter.next() {
                        Some((index, value)) => $T::from_value(value).map_err(|v| ElementMismatch::Kind {
                            index,
                            expected: $T::KIND,
                            actual: v.kind(),
                        })?,
                        None => return Err(ElementMismatch::Arity { expected: $arity, actual: 0 }),
                    };
                )+
                Ok(($($T,)+))
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<Value> {
                let ($($T,)+) = self;
                vec![$($T.into_value()),+]
            }
        }
    };
}

impl_value_tuple!(1; A);
impl_value_tuple!(2; A, B);
impl_value_tuple!(3; A, B, C);
impl_value_tuple!(4; A, B, C, D);
impl_value_tuple!(5; A, B, C, D, E);
impl_value_tuple!(6; A, B, C, D, E, F);
