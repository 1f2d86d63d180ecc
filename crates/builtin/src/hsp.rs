//! The state processor and frame builder as context interfaces.
//!
//! An `archi.hsp` context assembles an entry state and an optional
//! transition through slots, and its `execute` action runs the state
//! processor until the stack drains. An `archi.hsp.frame` context builds a
//! state frame slot by slot; its `frame` slot yields a value consumable as
//! the data of an advance state.

use archi_app::ContextInterface;
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value};
use archi_hsp::{Frame, State, StateFunction, StateProcessor, Transition, TransitionFunction};
use tracing::{debug, info};

use crate::util::count_of;

#[derive(Default)]
struct HspData {
    entry_function: Option<StateFunction>,
    entry_data: Value,
    entry_metadata: Value,
    transition_function: Option<TransitionFunction>,
    transition_data: Value,
}

impl HspData {
    fn entry_state(&self) -> Option<State> {
        self.entry_function.map(|function| {
            State::new(function)
                .with_data(self.entry_data.clone())
                .with_metadata(self.entry_metadata.clone())
        })
    }

    fn transition(&self) -> Option<Transition> {
        self.transition_function
            .map(|function| Transition::new(function).with_data(self.transition_data.clone()))
    }

    fn apply(&mut self, name: &str, value: &Value) -> ArchiResult<()> {
        match name {
            SLOT_ENTRY_STATE => {
                let state = value
                    .borrow_as::<State>()
                    .ok_or_else(|| ArchiError::value(name, "expected a state"))?;
                self.entry_function = Some(state.function());
                self.entry_data = state.data().clone();
                self.entry_metadata = state.metadata().clone();
            }
            SLOT_ENTRY_FUNC => {
                self.entry_function = Some(
                    value
                        .function_as::<StateFunction>()
                        .ok_or_else(|| ArchiError::value(name, "expected a state function"))?,
                );
            }
            SLOT_ENTRY_DATA => self.entry_data = value.clone(),
            SLOT_ENTRY_METADATA => self.entry_metadata = value.clone(),
            SLOT_TRANSITION => {
                let transition = value
                    .borrow_as::<Transition>()
                    .ok_or_else(|| ArchiError::value(name, "expected a transition"))?;
                self.transition_function = Some(transition.function);
                self.transition_data = transition.data.clone();
            }
            SLOT_TRANSITION_FUNC => {
                self.transition_function = Some(
                    value
                        .function_as::<TransitionFunction>()
                        .ok_or_else(|| ArchiError::value(name, "expected a transition function"))?,
                );
            }
            SLOT_TRANSITION_DATA => self.transition_data = value.clone(),
            other => return Err(ArchiError::key(other)),
        }
        Ok(())
    }
}

/// The `archi.hsp` interface: a context wrapping one state processor run.
pub struct HspInterface;

const SLOT_ENTRY_STATE: &str = "entry_state";
const SLOT_ENTRY_FUNC: &str = "entry_state.function";
const SLOT_ENTRY_DATA: &str = "entry_state.data";
const SLOT_ENTRY_METADATA: &str = "entry_state.metadata";
const SLOT_TRANSITION: &str = "transition";
const SLOT_TRANSITION_FUNC: &str = "transition.function";
const SLOT_TRANSITION_DATA: &str = "transition.data";
const ACTION_EXECUTE: &str = "execute";

impl ContextInterface for HspInterface {
    fn name(&self) -> &'static str {
        "archi.hsp"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let mut data = HspData::default();
        for (name, value) in params.iter_first_wins() {
            data.apply(name, value)?;
        }
        Ok(Value::data_of(
            data,
            ArrayLayout::of_type::<HspData>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let data = handle
            .borrow_as::<HspData>()
            .ok_or_else(|| ArchiError::misuse("hsp context handle is gone"))?;
        match slot.name.as_str() {
            SLOT_ENTRY_STATE => Ok(match data.entry_state() {
                Some(state) => Value::data_of(state, ArrayLayout::of_type::<State>(1)),
                None => Value::empty(),
            }),
            SLOT_ENTRY_FUNC => Ok(match data.entry_function {
                Some(function) => Value::function_of(function),
                None => Value::empty(),
            }),
            SLOT_ENTRY_DATA => Ok(data.entry_data.clone()),
            SLOT_ENTRY_METADATA => Ok(data.entry_metadata.clone()),
            SLOT_TRANSITION => Ok(match data.transition() {
                Some(transition) => {
                    Value::data_of(transition, ArrayLayout::of_type::<Transition>(1))
                }
                None => Value::empty(),
            }),
            SLOT_TRANSITION_FUNC => Ok(match data.transition_function {
                Some(function) => Value::function_of(function),
                None => Value::empty(),
            }),
            SLOT_TRANSITION_DATA => Ok(data.transition_data.clone()),
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }

    fn set(&self, handle: &Value, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        let mut data = handle
            .borrow_mut_as::<HspData>()
            .ok_or_else(|| ArchiError::misuse("hsp context handle is gone"))?;
        data.apply(&slot.name, value)
    }

    fn act(&self, handle: &Value, action: &SlotKey, _params: &ParamList) -> ArchiResult<()> {
        match action.name.as_str() {
            ACTION_EXECUTE => {
                // Snapshot the run inputs so the handle is not borrowed
                // while state functions execute.
                let (entry, transition) = {
                    let data = handle
                        .borrow_as::<HspData>()
                        .ok_or_else(|| ArchiError::misuse("hsp context handle is gone"))?;
                    (data.entry_state(), data.transition())
                };

                let Some(entry) = entry else {
                    debug!("hsp execute with no entry state is a no-op");
                    return Ok(());
                };

                info!("state processor starting");
                let result = StateProcessor::execute(&Frame::of(vec![entry]), transition);
                let code = result.as_ref().err().map_or(0, ArchiError::code);
                info!(code, "state processor finished");
                result
            }
            _ => Err(ArchiError::key(action.name.clone())),
        }
    }
}

#[derive(Default)]
struct FrameData {
    slots: Vec<Option<State>>,
}

/// The `archi.hsp.frame` interface: builds a state frame slot by slot.
pub struct FrameInterface;

const SLOT_STATE: &str = "state";
const SLOT_FRAME: &str = "frame";
const SLOT_NUM_STATES: &str = "num_states";

impl ContextInterface for FrameInterface {
    fn name(&self) -> &'static str {
        "archi.hsp.frame"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let mut num_states = 0;
        for (name, value) in params.iter_first_wins() {
            match name {
                SLOT_NUM_STATES => num_states = count_of(value),
                other => return Err(ArchiError::key(other)),
            }
        }

        Ok(Value::data_of(
            FrameData {
                slots: vec![None; num_states],
            },
            ArrayLayout::of_type::<FrameData>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let data = handle
            .borrow_as::<FrameData>()
            .ok_or_else(|| ArchiError::misuse("frame context handle is gone"))?;
        match slot.name.as_str() {
            // A snapshot: the frame is immutable once taken.
            SLOT_FRAME => Ok(Value::data_of(
                Frame::from_slots(data.slots.clone()),
                ArrayLayout::of_type::<Frame>(1),
            )),
            SLOT_NUM_STATES => Ok(Value::with_layout(ArrayLayout::of_count(data.slots.len()))),
            SLOT_STATE => {
                let index = slot_index(slot, data.slots.len())?;
                Ok(match &data.slots[index] {
                    Some(state) => {
                        Value::data_of(state.clone(), ArrayLayout::of_type::<State>(1))
                    }
                    None => Value::empty(),
                })
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }

    fn set(&self, handle: &Value, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        let mut data = handle
            .borrow_mut_as::<FrameData>()
            .ok_or_else(|| ArchiError::misuse("frame context handle is gone"))?;
        match slot.name.as_str() {
            SLOT_STATE => {
                let index = slot_index(slot, data.slots.len())?;
                data.slots[index] = decode_state(value)?;
                Ok(())
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }
}

/// Accepts a state value (data pointee), a bare state function, or an empty
/// value clearing the slot.
fn decode_state(value: &Value) -> ArchiResult<Option<State>> {
    if let Some(state) = value.borrow_as::<State>() {
        return Ok(Some(state.clone()));
    }
    if let Some(function) = value.function_as::<StateFunction>() {
        return Ok(Some(State::new(function)));
    }
    if !value.has_data() && !value.is_function() {
        return Ok(None);
    }
    Err(ArchiError::value(
        SLOT_STATE,
        "expected a state, a state function, or an empty value",
    ))
}

pub(crate) fn slot_index(slot: &SlotKey, len: usize) -> ArchiResult<usize> {
    let index = slot.single_index().ok_or_else(|| {
        ArchiError::misuse(format!("slot `{}` takes exactly one index", slot.name))
    })?;
    if index < 0 || index as usize >= len {
        return Err(ArchiError::misuse(format!(
            "index {index} out of range for `{}` of length {len}",
            slot.name
        )));
    }
    Ok(index as usize)
}
