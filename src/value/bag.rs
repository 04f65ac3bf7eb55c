//! Ordered, named collection of values.
use super::{IntoValue, Value};
use smallvec::SmallVec;

/// The generic argument/result bag handed across the type-erased boundary.
///
/// Entries keep insertion order; inserting an existing name overwrites the value
/// in place. Most property types declare a handful of slots, so the entries are
/// stored inline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueBag {
    entries: SmallVec<[(String, Value); 4]>,
}

impl ValueBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { entries: SmallVec::with_capacity(capacity) }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.insert(name, value.into_value());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ValueBag {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut bag = ValueBag::new();
        for (name, value) in iter {
            bag.insert(name, value);
        }
        bag
    }
}
