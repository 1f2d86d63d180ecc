//! The `archi.hsp.branch` interface: branch data for branching states.

use archi_app::ContextInterface;
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value};
use archi_hsp::{BranchData, BranchSelector, Frame};

use crate::hsp::slot_index;
use crate::util::count_of;

/// The `archi.hsp.branch` interface.
///
/// Init parameters: `num_branches`, optionally `selector` (a branch
/// selector function) with `selector.data`. The `data` slot yields the
/// branch data shared with the context, ready to be used as the state data
/// of a branch state.
pub struct BranchInterface;

const SLOT_BRANCH: &str = "branch";
const SLOT_DATA: &str = "data";
const SLOT_NUM_BRANCHES: &str = "num_branches";
const PARAM_SELECTOR: &str = "selector";
const PARAM_SELECTOR_DATA: &str = "selector.data";

impl ContextInterface for BranchInterface {
    fn name(&self) -> &'static str {
        "archi.hsp.branch"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let mut num_branches = 0;
        let mut selector: Option<BranchSelector> = None;
        let mut selector_data = Value::empty();

        for (name, value) in params.iter_first_wins() {
            match name {
                SLOT_NUM_BRANCHES => num_branches = count_of(value),
                PARAM_SELECTOR => {
                    selector = Some(value.function_as::<BranchSelector>().ok_or_else(|| {
                        ArchiError::value(name, "expected a branch selector function")
                    })?);
                }
                PARAM_SELECTOR_DATA => selector_data = value.clone(),
                other => return Err(ArchiError::key(other)),
            }
        }

        let mut data = BranchData::new(num_branches);
        if let Some(selector) = selector {
            data = data.with_selector(selector, selector_data);
        }

        Ok(Value::data_of(
            data,
            ArrayLayout::of_type::<BranchData>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        // The data slot shares the pointee: a branch state wired to the
        // returned value sees branches installed later.
        if slot.name == SLOT_DATA {
            let shared = handle
                .data_ref()
                .ok_or_else(|| ArchiError::misuse("branch data handle is gone"))?
                .clone();
            return Ok(Value::from_data_ref(
                shared,
                ArrayLayout::of_type::<BranchData>(1),
            ));
        }

        let data = handle
            .borrow_as::<BranchData>()
            .ok_or_else(|| ArchiError::misuse("branch data handle is gone"))?;
        match slot.name.as_str() {
            SLOT_NUM_BRANCHES => Ok(Value::with_layout(ArrayLayout::of_count(
                data.num_branches(),
            ))),
            SLOT_BRANCH => {
                let index = slot_index(slot, data.num_branches())?;
                Ok(match data.branch(index) {
                    Some(frame) => {
                        Value::data_of(frame.clone(), ArrayLayout::of_type::<Frame>(1))
                    }
                    None => Value::empty(),
                })
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }

    fn set(&self, handle: &Value, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        let mut data = handle
            .borrow_mut_as::<BranchData>()
            .ok_or_else(|| ArchiError::misuse("branch data handle is gone"))?;
        match slot.name.as_str() {
            SLOT_BRANCH => {
                let index = slot_index(slot, data.num_branches())?;
                let frame = value
                    .borrow_as::<Frame>()
                    .map(|frame| frame.clone())
                    .ok_or_else(|| ArchiError::value(SLOT_BRANCH, "expected a frame"))?;
                data.set_branch(index, frame);
                Ok(())
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }
}
