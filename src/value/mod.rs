//! The type-erased data that crosses module boundaries.
//!
//! Every input and result travelling through `run_as` is a [`Value`]: a tagged
//! union carrying its runtime kind alongside the payload. Property types convert
//! between ordered bags of these values and the concrete tuples a module
//! implementation works with (see [`convert`]).
pub mod bag;
pub mod convert;

pub use bag::ValueBag;
pub use convert::{ElementMismatch, FromValue, IntoValue, ValueTuple};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The atomic unit of data exchanged between modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Shared reference to a vector of samples (coordinates, grids, spectra...).
    /// Cloning a cached result only bumps the reference count.
    Series(Arc<Vec<f64>>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

/// Runtime tag of a [`Value`], used by slot declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    Series,
    List,
    Map,
    /// Declaration-only kind: the slot accepts a value of any kind.
    Any,
}

impl ValueKind {
    /// Whether a slot declared with this kind accepts a value of kind `actual`.
    pub fn accepts(self, actual: ValueKind) -> bool {
        self == ValueKind::Any || self == actual
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            ValueKind::Bool => 1,
            ValueKind::Int => 2,
            ValueKind::Float => 3,
            ValueKind::Str => 4,
            ValueKind::Series => 5,
            ValueKind::List => 6,
            ValueKind::Map => 7,
            ValueKind::Any => 0,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::Series => "series",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Any => "any",
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Series(_) => ValueKind::Series,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    pub fn series(values: Vec<f64>) -> Self {
        Value::Series(Arc::new(values))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Value::Series(s) => Some(s.as_slice()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Series(s) if s.len() > 4 => write!(f, "[len={}]", s.len()),
            Value::Series(s) => {
                let parts: Vec<String> = s.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}
