//! The `archi.array` interface: a fixed-size array of values.
//!
//! Elements are whole values, so an array context can hold references to
//! other contexts: storing a pinned handle value keeps its context alive,
//! and overwriting the element releases the previous pin.

use archi_app::ContextInterface;
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value};

use crate::hsp::slot_index;
use crate::util::count_of;

/// The `archi.array` interface.
pub struct ArrayInterface;

const SLOT_ELEMENT: &str = "element";
const SLOT_NUM_ELEMENTS: &str = "num_elements";

impl ContextInterface for ArrayInterface {
    fn name(&self) -> &'static str {
        "archi.array"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let mut num_elements = 0;
        for (name, value) in params.iter_first_wins() {
            match name {
                SLOT_NUM_ELEMENTS => num_elements = count_of(value),
                other => return Err(ArchiError::key(other)),
            }
        }

        Ok(Value::data_of(
            vec![Value::empty(); num_elements],
            ArrayLayout::of_type::<Vec<Value>>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let elements = handle
            .borrow_as::<Vec<Value>>()
            .ok_or_else(|| ArchiError::misuse("array handle is gone"))?;
        match slot.name.as_str() {
            SLOT_NUM_ELEMENTS => Ok(Value::with_layout(ArrayLayout::of_count(elements.len()))),
            SLOT_ELEMENT => {
                let index = slot_index(slot, elements.len())?;
                Ok(elements[index].clone())
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }

    fn set(&self, handle: &Value, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        let mut elements = handle
            .borrow_mut_as::<Vec<Value>>()
            .ok_or_else(|| ArchiError::misuse("array handle is gone"))?;
        match slot.name.as_str() {
            SLOT_ELEMENT => {
                let index = slot_index(slot, elements.len())?;
                // The previous element drops here, releasing whatever pin
                // it carried.
                elements[index] = value.clone();
                Ok(())
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }
}
