//! Named parameter lists and slot designators.
//!
//! Context entry points receive keyword arguments as an ordered list of
//! `(name, value)` pairs. Duplicate names are permitted and their order is
//! observable; a consumer processing parameters in order must skip any later
//! occurrence of a name it has already recognised (first-write-wins). Slots
//! and actions are designated by a name plus zero or more integer indices.

use std::collections::HashSet;
use std::fmt;

use crate::value::Value;

/// One named parameter.
#[derive(Debug, Clone)]
pub struct Param {
    /// Parameter name; not necessarily unique within a list.
    pub name: String,
    /// Parameter value.
    pub value: Value,
}

/// An ordered list of named parameters.
#[derive(Debug, Clone, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, keeping any earlier occurrence of the name.
    pub fn push<S: Into<String>>(&mut self, name: S, value: Value) {
        self.params.push(Param {
            name: name.into(),
            value,
        });
    }

    /// Builder-style [`ParamList::push`].
    pub fn with<S: Into<String>>(mut self, name: S, value: Value) -> Self {
        self.push(name, value);
        self
    }

    /// Returns the number of parameters, duplicates included.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` when the list has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates over all parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// Returns the first occurrence of `name`, the one that wins.
    pub fn first(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|param| param.name == name)
            .map(|param| &param.value)
    }

    /// Iterates over parameters with later duplicates skipped, so each name
    /// is yielded exactly once with its winning value.
    pub fn iter_first_wins(&self) -> impl Iterator<Item = (&str, &Value)> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.params.iter().filter_map(move |param| {
            seen.insert(param.name.as_str())
                .then(|| (param.name.as_str(), &param.value))
        })
    }
}

impl FromIterator<(String, Value)> for ParamList {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(name, value)| Param { name, value })
                .collect(),
        }
    }
}

/// Designator of a slot or an action on a context.
///
/// A slot may be parameterised by integer indices; this is how arrays,
/// matrices and other multi-dimensional structures are exposed uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotKey {
    /// Slot or action name, interface-defined.
    pub name: String,
    /// Optional indices qualifying the name.
    pub indices: Vec<i64>,
}

impl SlotKey {
    /// Creates an index-less designator.
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            indices: Vec::new(),
        }
    }

    /// Creates an indexed designator.
    pub fn indexed<S: Into<String>>(name: S, indices: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    /// Returns the only index of a one-dimensional designator.
    pub fn single_index(&self) -> Option<i64> {
        match self.indices.as_slice() {
            [index] => Some(*index),
            _ => None,
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for index in &self.indices {
            write!(f, "[{index}]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ArrayLayout;

    #[test]
    fn first_write_wins() {
        let params = ParamList::new()
            .with("a", Value::with_layout(ArrayLayout::of_count(1)))
            .with("b", Value::with_layout(ArrayLayout::of_count(2)))
            .with("a", Value::with_layout(ArrayLayout::of_count(3)));

        assert_eq!(params.len(), 3);
        assert_eq!(params.first("a").unwrap().layout().num_of, 1);

        let unique: Vec<_> = params
            .iter_first_wins()
            .map(|(name, value)| (name, value.layout().num_of))
            .collect();
        assert_eq!(unique, vec![("a", 1), ("b", 2)]);
    }

    #[test]
    fn ordering_is_observable() {
        let params = ParamList::new()
            .with("z", Value::empty())
            .with("a", Value::empty());
        let names: Vec<_> = params.iter().map(|param| param.name.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn missing_name() {
        assert!(ParamList::new().first("absent").is_none());
    }

    #[test]
    fn slot_key_display() {
        assert_eq!(SlotKey::named("inc").to_string(), "inc");
        assert_eq!(SlotKey::indexed("m", vec![2, 3]).to_string(), "m[2][3]");
    }

    #[test]
    fn single_index() {
        assert_eq!(SlotKey::indexed("e", vec![4]).single_index(), Some(4));
        assert_eq!(SlotKey::named("e").single_index(), None);
        assert_eq!(SlotKey::indexed("e", vec![1, 2]).single_index(), None);
    }
}
