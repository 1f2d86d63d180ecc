//! Small helpers shared by the built-in interfaces.

use archi_core::Value;

/// Extracts an element count from a parameter value: an `i64` pointee wins,
/// otherwise the layout's `num_of` is taken.
pub(crate) fn count_of(value: &Value) -> usize {
    if let Some(count) = value.borrow_as::<i64>() {
        return (*count).max(0) as usize;
    }
    value.layout().num_of
}

/// Extracts a string from a parameter value.
pub(crate) fn string_of(value: &Value) -> Option<String> {
    value.borrow_as::<String>().map(|text| text.clone())
}
